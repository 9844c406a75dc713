//! Point-in-polygon lookup over area-unit boundaries.
//!
//! Uses an R-tree (via `rstar`) over bounding boxes to bound the candidate
//! set, then tests exact containment in source order. The first containing
//! polygon wins, exactly as a linear scan over the same candidates would.

use geo::{BoundingRect, Contains, MultiPolygon, Relate};
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, warn};

use crate::coords::LatLon;
use crate::model::AreaUnit;

/// Bounding box of one boundary, tagged with its source position.
#[derive(Debug, Clone)]
struct Envelope {
    bounds: AABB<[f64; 2]>,
    slot: usize,
}

impl RTreeObject for Envelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

#[derive(Debug, Clone)]
struct Entry {
    code: String,
    boundary: MultiPolygon<f64>,
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit<'l> {
    pub code: &'l str,
    /// Number of candidates containing the point. Anything above 1 means
    /// overlapping boundaries.
    pub containing: usize,
}

/// Immutable spatial index over a fixed candidate set.
#[derive(Debug, Clone)]
pub struct SpatialLocator {
    entries: Vec<Entry>,
    tree: RTree<Envelope>,
    skipped: usize,
    overlapping_pairs: usize,
}

impl SpatialLocator {
    /// Indexes the candidates that have a usable boundary; the rest are
    /// skipped and counted. With `validate_overlaps`, pairs of boundaries
    /// whose interiors intersect are counted and logged.
    pub fn build<'u>(candidates: impl IntoIterator<Item = &'u AreaUnit>, validate_overlaps: bool) -> Self {
        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for unit in candidates {
            match &unit.boundary {
                Some(boundary) if boundary.bounding_rect().is_some() => entries.push(Entry {
                    code: unit.code.clone(),
                    boundary: boundary.clone(),
                }),
                _ => skipped += 1,
            }
        }

        let envelopes: Vec<Envelope> = entries
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| {
                let rect = e.boundary.bounding_rect()?;
                Some(Envelope {
                    bounds: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                    slot,
                })
            })
            .collect();

        let mut locator = Self {
            entries,
            tree: RTree::bulk_load(envelopes),
            skipped,
            overlapping_pairs: 0,
        };
        if validate_overlaps {
            locator.overlapping_pairs = locator.count_overlaps();
            if locator.overlapping_pairs > 0 {
                warn!(pairs = locator.overlapping_pairs, "overlapping area-unit boundaries");
            }
        }
        debug!(indexed = locator.entries.len(), skipped, "spatial locator built");
        locator
    }

    /// First candidate (in source order) whose boundary strictly contains
    /// `at`.
    pub fn locate(&self, at: LatLon) -> Option<Hit<'_>> {
        let point = at.to_point();
        let probe = AABB::from_point([point.x(), point.y()]);

        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&probe)
            .map(|e| e.slot)
            .collect();
        slots.sort_unstable();

        let mut containing = slots
            .into_iter()
            .filter(|&slot| self.entries[slot].boundary.contains(&point));
        let first = containing.next()?;
        Some(Hit {
            code: &self.entries[first].code,
            containing: 1 + containing.count(),
        })
    }

    /// Candidates dropped at build time for lack of a boundary.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Boundary pairs whose interiors intersect; 0 unless validated.
    pub fn overlapping_pairs(&self) -> usize {
        self.overlapping_pairs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn count_overlaps(&self) -> usize {
        let mut pairs = 0usize;
        for env in self.tree.iter() {
            let a = &self.entries[env.slot].boundary;
            for other in self.tree.locate_in_envelope_intersecting(&env.bounds) {
                if other.slot <= env.slot {
                    continue;
                }
                let im = a.relate(&self.entries[other.slot].boundary);
                if im.is_intersects() && !im.is_touches() {
                    warn!(
                        a = %self.entries[env.slot].code,
                        b = %self.entries[other.slot].code,
                        "area-unit boundaries overlap"
                    );
                    pairs += 1;
                }
            }
        }
        pairs
    }
}

/// Reference linear scan: first candidate whose boundary contains `at`.
/// Candidates without a boundary are skipped.
pub fn locate_linear<'u>(at: LatLon, candidates: &[&'u AreaUnit]) -> Option<&'u str> {
    let point = at.to_point();
    candidates
        .iter()
        .find(|u| u.boundary.as_ref().is_some_and(|b| b.contains(&point)))
        .map(|u| u.code.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_boundary;
    use crate::model::{AdministrativeKey, Urbanicity};

    fn square(code: &str, x0: f64, y0: f64, size: f64) -> AreaUnit {
        rect(code, x0, y0, x0 + size, y0 + size)
    }

    fn rect(code: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> AreaUnit {
        let wkt = format!("POLYGON(({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))");
        AreaUnit {
            code: code.into(),
            key: AdministrativeKey::parse("09007").unwrap(),
            urbanicity: Urbanicity::Urban,
            boundary: parse_boundary(&wkt),
        }
    }

    // 4x4 cells of 0.01 degrees; neighbours share bit-identical edges.
    fn grid() -> Vec<AreaUnit> {
        let lon = |k: usize| -99.2 + k as f64 * 0.01;
        let lat = |k: usize| 19.3 + k as f64 * 0.01;
        let mut units = Vec::new();
        for row in 0..4 {
            for col in 0..4 {
                let code = format!("09007000100{row}{col}");
                units.push(rect(&code, lon(col), lat(row), lon(col + 1), lat(row + 1)));
            }
        }
        units
    }

    #[test]
    fn point_inside_exactly_one_square() {
        let units = grid();
        let loc = SpatialLocator::build(&units, true);
        assert_eq!(loc.overlapping_pairs(), 0);
        let hit = loc.locate(LatLon::new(19.325, -99.175)).unwrap();
        assert_eq!(hit.code, "0900700010022");
        assert_eq!(hit.containing, 1);
    }

    #[test]
    fn point_outside_everything_is_none() {
        let units = grid();
        let loc = SpatialLocator::build(&units, false);
        assert!(loc.locate(LatLon::new(25.0, -100.0)).is_none());
    }

    #[test]
    fn missing_boundaries_are_skipped() {
        let mut units = grid();
        units[0].boundary = None;
        let loc = SpatialLocator::build(&units, false);
        assert_eq!(loc.skipped(), 1);
        assert_eq!(loc.len(), 15);
        assert!(loc.locate(LatLon::new(19.305, -99.195)).is_none());
    }

    #[test]
    fn indexed_lookup_matches_linear_scan() {
        let units = grid();
        let loc = SpatialLocator::build(&units, false);
        let refs: Vec<&AreaUnit> = units.iter().collect();
        for i in 0..40 {
            for j in 0..40 {
                let at = LatLon::new(19.2951 + i as f64 * 0.00123, -99.2049 + j as f64 * 0.00123);
                assert_eq!(loc.locate(at).map(|h| h.code), locate_linear(at, &refs));
            }
        }
    }

    #[test]
    fn overlap_is_counted_and_first_in_source_order_wins() {
        let units = vec![
            square("0900700010001", 0.0, 0.0, 2.0),
            square("0900700010002", 1.0, 1.0, 2.0),
            square("0900700010003", 2.0, 0.0, 1.0),
        ];
        let loc = SpatialLocator::build(&units, true);
        // 1 and 2 overlap; 3 only shares edges with both.
        assert_eq!(loc.overlapping_pairs(), 1);
        let hit = loc.locate(LatLon::new(1.5, 1.5)).unwrap();
        assert_eq!(hit.code, "0900700010001");
        assert_eq!(hit.containing, 2);
    }
}
