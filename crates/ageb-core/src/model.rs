//! Core records: area units, administrative keys, source records and
//! assignment results.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::is_digits;
use crate::coords::LatLon;

/// Canonical area-unit code length: state(2) + municipality(3) +
/// locality(4) + area id(4).
pub const CANONICAL_CODE_LEN: usize = 13;
/// Coarse municipality-plus-locality form that needs correction.
pub const COARSE_CODE_LEN: usize = 9;

// ── Area units ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urbanicity {
    Urban,
    Rural,
}

impl Urbanicity {
    /// Accepts the census spellings ("Urbana", "Rural") and short forms.
    pub fn parse(flag: &str) -> Option<Self> {
        match flag.trim().to_ascii_lowercase().as_str() {
            "urbana" | "urban" | "u" => Some(Self::Urban),
            "rural" | "r" => Some(Self::Rural),
            _ => None,
        }
    }
}

/// State (2 digits) + municipality (3 digits, zero padded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdministrativeKey {
    pub state: String,
    pub municipality: String,
}

impl AdministrativeKey {
    /// Builds a key from raw components, zero padding both. Returns `None`
    /// when either component is not numeric or too long.
    pub fn new(state: &str, municipality: &str) -> Option<Self> {
        let state = zero_pad(state.trim(), 2)?;
        let municipality = zero_pad(municipality.trim(), 3)?;
        Some(Self { state, municipality })
    }

    /// Parses the 5-char concatenated form.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        if !is_digits(key, 5) {
            return None;
        }
        Some(Self {
            state: key[..2].to_string(),
            municipality: key[2..].to_string(),
        })
    }
}

impl fmt::Display for AdministrativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.state, self.municipality)
    }
}

/// Left-pads a digit string with zeros to `width`.
pub(crate) fn zero_pad(value: &str, width: usize) -> Option<String> {
    if value.is_empty() || value.len() > width || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{value:0>width$}"))
}

/// Smallest census division. `boundary` is `None` when the source geometry
/// failed to parse; such units never match a spatial query.
#[derive(Debug, Clone)]
pub struct AreaUnit {
    pub code: String,
    pub key: AdministrativeKey,
    pub urbanicity: Urbanicity,
    pub boundary: Option<MultiPolygon<f64>>,
}

impl AreaUnit {
    pub fn is_urban(&self) -> bool {
        self.urbanicity == Urbanicity::Urban
    }
}

// ── Input rows ────────────────────────────────────────────────────────────────

/// One row of the area-unit table as delivered by the reader collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaUnitRow {
    pub code: String,
    pub state: String,
    pub municipality: String,
    pub urbanicity: String,
    pub geometry_wkt: String,
}

/// One row of the postal-centroid table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidRow {
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub state_name: Option<String>,
}

/// An address record that needs an area code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub state_name: String,
    pub municipality_name: String,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub admin_id: Option<String>,
    /// Area code the record already carried, if any.
    #[serde(default)]
    pub existing_code: Option<String>,
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Which strategy produced an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodTag {
    PreAssigned,
    SpatialContainment,
    UniqueInKey,
    DistributionByNeighborhood,
    DistributionByKey,
    RegionFallback,
    Unresolved,
    CorrectedAdministrative,
    CorrectedRegion,
    CorrectedSpatial,
}

impl MethodTag {
    pub const ALL: [MethodTag; 10] = [
        MethodTag::PreAssigned,
        MethodTag::SpatialContainment,
        MethodTag::UniqueInKey,
        MethodTag::DistributionByNeighborhood,
        MethodTag::DistributionByKey,
        MethodTag::RegionFallback,
        MethodTag::Unresolved,
        MethodTag::CorrectedAdministrative,
        MethodTag::CorrectedRegion,
        MethodTag::CorrectedSpatial,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MethodTag::PreAssigned => "pre-assigned",
            MethodTag::SpatialContainment => "spatial-containment",
            MethodTag::UniqueInKey => "unique-in-key",
            MethodTag::DistributionByNeighborhood => "distribution-by-neighborhood",
            MethodTag::DistributionByKey => "distribution-by-key",
            MethodTag::RegionFallback => "region-fallback",
            MethodTag::Unresolved => "unresolved",
            MethodTag::CorrectedAdministrative => "corrected-administrative",
            MethodTag::CorrectedRegion => "corrected-region",
            MethodTag::CorrectedSpatial => "corrected-spatial",
        }
    }
}

impl fmt::Display for MethodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final code for one record. An empty `code` means unresolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub code: String,
    pub method: MethodTag,
    #[serde(default)]
    pub coordinate: Option<LatLon>,
}

impl AssignmentResult {
    pub fn new(code: impl Into<String>, method: MethodTag) -> Self {
        Self { code: code.into(), method, coordinate: None }
    }

    pub fn located(code: impl Into<String>, method: MethodTag, at: LatLon) -> Self {
        Self { code: code.into(), method, coordinate: Some(at) }
    }

    pub fn unresolved() -> Self {
        Self::new(String::new(), MethodTag::Unresolved)
    }

    pub fn is_resolved(&self) -> bool {
        !self.code.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_zero_pads_components() {
        let key = AdministrativeKey::new("9", "7").unwrap();
        assert_eq!(key.to_string(), "09007");
        assert_eq!(AdministrativeKey::parse("15033").unwrap().municipality, "033");
        assert!(AdministrativeKey::new("09", "1234").is_none());
        assert!(AdministrativeKey::new("09", "0a1").is_none());
        assert!(AdministrativeKey::parse("1503").is_none());
    }

    #[test]
    fn urbanicity_accepts_census_spellings() {
        assert_eq!(Urbanicity::parse("Urbana"), Some(Urbanicity::Urban));
        assert_eq!(Urbanicity::parse(" RURAL "), Some(Urbanicity::Rural));
        assert_eq!(Urbanicity::parse("mixed"), None);
    }

    #[test]
    fn method_tags_serialize_kebab_case() {
        for tag in MethodTag::ALL {
            let json = serde_json::to_string(&tag).unwrap();
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
        }
    }

    #[test]
    fn record_optional_fields_default_to_none() {
        let rec: SourceRecord = serde_json::from_str(
            r#"{ "id": "R1", "state_name": "Mexico", "municipality_name": "Chalco" }"#,
        )
        .unwrap();
        assert!(rec.neighborhood.is_none());
        assert!(rec.postal_code.is_none());
        assert!(rec.existing_code.is_none());
    }
}
