//! Area-unit table loading: region filter, key normalization and tolerant
//! WKT parsing.

use geo::{Geometry, MultiPolygon};
use std::collections::HashSet;
use tracing::{debug, warn};
use wkt::TryFromWkt;

use crate::config::AssignerConfig;
use crate::error::{AgebError, Result};
use crate::model::{AdministrativeKey, AreaUnit, AreaUnitRow, Urbanicity};

const TABLE: &str = "area-unit";

/// Counters collected while loading the area-unit table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    pub outside_region: usize,
    pub duplicate_codes: usize,
    pub geometry_failures: usize,
}

/// All area units of the modeled regions, in source order.
#[derive(Debug, Clone)]
pub struct AreaCatalog {
    pub units: Vec<AreaUnit>,
    pub stats: LoadStats,
}

impl AreaCatalog {
    /// Loads area units from already-parsed rows.
    ///
    /// Rows outside `config.modeled_states` are dropped. A row with a
    /// malformed state/municipality/urbanicity field aborts the load; a row
    /// with an unparsable geometry is kept without a boundary and counted.
    pub fn from_rows(rows: &[AreaUnitRow], config: &AssignerConfig) -> Result<Self> {
        let mut stats = LoadStats { rows: rows.len(), ..LoadStats::default() };
        let mut seen: HashSet<&str> = HashSet::with_capacity(rows.len());
        let mut units = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            let key = AdministrativeKey::new(&row.state, &row.municipality).ok_or_else(|| {
                AgebError::InvalidTable {
                    table: TABLE,
                    row: i,
                    reason: format!(
                        "bad administrative components `{}`/`{}`",
                        row.state, row.municipality
                    ),
                }
            })?;
            if !config.is_modeled(&key.state) {
                stats.outside_region += 1;
                continue;
            }
            let urbanicity =
                Urbanicity::parse(&row.urbanicity).ok_or_else(|| AgebError::InvalidTable {
                    table: TABLE,
                    row: i,
                    reason: format!("unknown urbanicity flag `{}`", row.urbanicity),
                })?;

            let code = row.code.trim();
            if code.is_empty() {
                return Err(AgebError::InvalidTable {
                    table: TABLE,
                    row: i,
                    reason: "empty area code".into(),
                });
            }
            if !seen.insert(code) {
                stats.duplicate_codes += 1;
                continue;
            }

            let boundary = parse_boundary(&row.geometry_wkt);
            if boundary.is_none() {
                stats.geometry_failures += 1;
            }
            units.push(AreaUnit {
                code: code.to_string(),
                key,
                urbanicity,
                boundary,
            });
        }

        if units.is_empty() {
            return Err(AgebError::EmptyTable(TABLE));
        }
        if stats.geometry_failures > 0 {
            warn!(
                failures = stats.geometry_failures,
                "area units without a usable boundary"
            );
        }
        if stats.duplicate_codes > 0 {
            warn!(duplicates = stats.duplicate_codes, "duplicate area codes dropped");
        }
        debug!(
            loaded = units.len(),
            outside_region = stats.outside_region,
            "area catalog built"
        );
        Ok(Self { units, stats })
    }
}

/// Parses a WKT `POLYGON` or `MULTIPOLYGON`. Anything else, including empty
/// geometries, is a failure.
pub fn parse_boundary(wkt: &str) -> Option<MultiPolygon<f64>> {
    let boundary = match Geometry::<f64>::try_from_wkt_str(wkt.trim()).ok()? {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        _ => return None,
    };
    if boundary.0.is_empty() || boundary.0.iter().all(|p| p.exterior().0.len() < 4) {
        return None;
    }
    Some(boundary)
}
