//! Postal-code centroid lookup.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::AssignerConfig;
use crate::coords::LatLon;
use crate::error::{AgebError, Result};
use crate::model::{zero_pad, CentroidRow};

/// Canonical postal code length.
pub const POSTAL_CODE_LEN: usize = 5;

const TABLE: &str = "postal-centroid";

/// Read-only postal code -> coordinate map. Keys are canonical 5-digit codes.
#[derive(Debug, Clone, Default)]
pub struct CentroidTable {
    coords: HashMap<String, LatLon>,
    skipped: usize,
}

impl CentroidTable {
    /// Builds the table from already-parsed rows.
    ///
    /// Short numeric codes are zero padded. Rows whose `state_name` maps to a
    /// state outside the modeled regions are ignored; rows with a non-numeric
    /// code or an invalid coordinate are skipped and counted. On duplicate
    /// codes the last row wins.
    pub fn from_rows(rows: &[CentroidRow], config: &AssignerConfig) -> Result<Self> {
        let mut coords = HashMap::with_capacity(rows.len());
        let mut skipped = 0usize;

        for row in rows {
            if let Some(state) = row.state_name.as_deref() {
                match config.state_code(state) {
                    Some(code) if config.is_modeled(code) => {}
                    _ => continue,
                }
            }
            let at = LatLon::new(row.latitude, row.longitude);
            let Some(code) = zero_pad(row.postal_code.trim(), POSTAL_CODE_LEN) else {
                skipped += 1;
                continue;
            };
            if !at.is_valid() {
                skipped += 1;
                continue;
            }
            coords.insert(code, at);
        }

        if coords.is_empty() {
            return Err(AgebError::EmptyTable(TABLE));
        }
        if skipped > 0 {
            warn!(skipped, "malformed postal centroid rows skipped");
        }
        debug!(codes = coords.len(), "centroid table built");
        Ok(Self { coords, skipped })
    }

    /// Builds a table directly from canonical codes, for callers that already
    /// hold clean data.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, LatLon)>,
        S: Into<String>,
    {
        Self {
            coords: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            skipped: 0,
        }
    }

    pub fn lookup(&self, postal_code: &str) -> Option<LatLon> {
        self.coords.get(postal_code).copied()
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }
}
