//! Administrative key derivation for source records.

use crate::config::AssignerConfig;
use crate::model::{AdministrativeKey, SourceRecord};

/// Administrative location of a record, as far as it can be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    pub state: Option<String>,
    pub key: Option<AdministrativeKey>,
}

/// Derives the state code and administrative key of a record.
///
/// The municipality comes from the raw administrative identifier, zero
/// padded to 5 digits, last 3 digits. When the identifier is missing or not
/// numeric, the municipality directory is consulted by name; a directory hit
/// also supplies the state when the record's state name is unknown.
pub fn locate_record(record: &SourceRecord, config: &AssignerConfig) -> RecordLocation {
    let state = config.state_code(&record.state_name).map(str::to_string);

    let from_id = config
        .present(record.admin_id.as_deref())
        .and_then(municipality_from_id)
        .and_then(|mun| AdministrativeKey::new(state.as_deref()?, &mun));
    if from_id.is_some() {
        return RecordLocation { state, key: from_id };
    }

    let from_directory = config
        .municipality_key(&record.municipality_name)
        .and_then(AdministrativeKey::parse);
    match from_directory {
        Some(key) => RecordLocation {
            state: state.or_else(|| Some(key.state.clone())),
            key: Some(key),
        },
        None => RecordLocation { state, key: None },
    }
}

fn municipality_from_id(raw: &str) -> Option<String> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{raw:0>5}");
    Some(padded[padded.len() - 3..].to_string())
}
