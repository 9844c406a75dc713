//! Run configuration: modeled regions, name tables and pass switches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AgebError, Result};

/// Knobs shared by every pass. Defaults model Ciudad de México (09) and
/// Estado de México (15).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignerConfig {
    /// State codes whose area units are loaded.
    pub modeled_states: Vec<String>,
    /// Record state name -> 2-char state code. Matched case-insensitively.
    pub state_names: BTreeMap<String, String>,
    /// Municipality name -> 5-char administrative key, used when a record's
    /// raw administrative identifier is missing or malformed.
    pub municipality_directory: BTreeMap<String, String>,
    /// Tokens that mean "no value" in free-text and code fields.
    pub placeholders: Vec<String>,
    /// Correction also requires the referenced unit to be urban.
    pub require_urban: bool,
    /// Check polygon non-overlap when the spatial locator is built.
    pub validate_overlaps: bool,
    /// Postal re-resolution only considers urban polygons.
    pub urban_postal_locator: bool,
}

impl Default for AssignerConfig {
    fn default() -> Self {
        let state_names = [
            ("Ciudad de Mexico", "09"),
            ("CIUDAD DE MEXICO", "09"),
            ("CDMX", "09"),
            ("Mexico", "15"),
            ("MEXICO", "15"),
            ("Estado de Mexico", "15"),
        ]
        .into_iter()
        .map(|(name, code)| (name.to_string(), code.to_string()))
        .collect();

        Self {
            modeled_states: vec!["09".into(), "15".into()],
            state_names,
            municipality_directory: BTreeMap::new(),
            placeholders: ["", ".", "nan", "#N/A"].iter().map(|s| s.to_string()).collect(),
            require_urban: true,
            validate_overlaps: true,
            urban_postal_locator: true,
        }
    }
}

impl AssignerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AgebError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects codes that could never match a canonical area-unit code.
    pub fn validate(&self) -> Result<()> {
        if self.modeled_states.is_empty() {
            return Err(AgebError::Config("modeled_states is empty".into()));
        }
        for state in self.modeled_states.iter().chain(self.state_names.values()) {
            if !is_digits(state, 2) {
                return Err(AgebError::Config(format!(
                    "state code `{state}` must be 2 digits"
                )));
            }
        }
        for (name, key) in &self.municipality_directory {
            if !is_digits(key, 5) {
                return Err(AgebError::Config(format!(
                    "administrative key `{key}` for `{name}` must be 5 digits"
                )));
            }
        }
        Ok(())
    }

    /// True when `value` is absent in the sense of the placeholder list.
    pub fn is_placeholder(&self, value: &str) -> bool {
        let trimmed = value.trim();
        self.placeholders.iter().any(|p| p.eq_ignore_ascii_case(trimmed))
    }

    /// Trimmed value, or `None` for placeholders.
    pub fn present<'a>(&self, value: Option<&'a str>) -> Option<&'a str> {
        value
            .map(str::trim)
            .filter(|v| !self.is_placeholder(v))
    }

    pub fn state_code(&self, state_name: &str) -> Option<&str> {
        let wanted = state_name.trim();
        self.state_names
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, code)| code.as_str())
    }

    pub fn is_modeled(&self, state_code: &str) -> bool {
        self.modeled_states.iter().any(|s| s == state_code)
    }

    pub fn municipality_key(&self, municipality_name: &str) -> Option<&str> {
        let wanted = municipality_name.trim();
        self.municipality_directory
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, key)| key.as_str())
    }
}

pub(crate) fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}
