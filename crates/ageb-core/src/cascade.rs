//! The resolution cascade: ordered strategies from precise to coarse.
//!
//! Tier order:
//!   0. Pre-assigned code carried by the record
//!   1. Spatial containment of the postal-code centroid
//!   2. Distribution inside the administrative key
//!   3. Distribution inside the whole state
//!   4. Unresolved
//!
//! The cascade is a pure function of (record, index, centroids, locator).

use tracing::{debug, trace, warn};

use crate::admin::{locate_record, RecordLocation};
use crate::batch::map_indexed;
use crate::centroid::{CentroidTable, POSTAL_CODE_LEN};
use crate::config::AssignerConfig;
use crate::coords::LatLon;
use crate::diagnostics::Diagnostics;
use crate::distributor::pick;
use crate::index::AreaIndex;
use crate::locator::{Hit, SpatialLocator};
use crate::model::{AssignmentResult, MethodTag, SourceRecord};

// ── Tier 1 ────────────────────────────────────────────────────────────────────

/// Result of trying spatial containment for one postal code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialOutcome<'l> {
    /// No canonical 5-digit postal code.
    Inapplicable,
    NoCentroid,
    NotContained(LatLon),
    Contained { hit: Hit<'l>, at: LatLon },
}

/// True for exactly five ASCII digits.
pub fn is_canonical_postal_code(code: &str) -> bool {
    code.len() == POSTAL_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

/// Looks up the centroid of `postal_code` and the polygon containing it.
pub fn spatial_containment<'l>(
    postal_code: Option<&str>,
    centroids: &CentroidTable,
    locator: &'l SpatialLocator,
) -> SpatialOutcome<'l> {
    let Some(code) = postal_code.map(str::trim).filter(|c| is_canonical_postal_code(c)) else {
        return SpatialOutcome::Inapplicable;
    };
    let Some(at) = centroids.lookup(code) else {
        return SpatialOutcome::NoCentroid;
    };
    match locator.locate(at) {
        Some(hit) => SpatialOutcome::Contained { hit, at },
        None => SpatialOutcome::NotContained(at),
    }
}

// ── Tiers 2 and 3 ─────────────────────────────────────────────────────────────

/// Method tags emitted by the administrative tiers. The cascade and the
/// correction pass run the same tiers under different labels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TierTags {
    pub unique: MethodTag,
    pub by_neighborhood: MethodTag,
    pub by_key: MethodTag,
    pub region: MethodTag,
}

pub(crate) const CASCADE_TAGS: TierTags = TierTags {
    unique: MethodTag::UniqueInKey,
    by_neighborhood: MethodTag::DistributionByNeighborhood,
    by_key: MethodTag::DistributionByKey,
    region: MethodTag::RegionFallback,
};

/// Tier 2: candidates under the record's administrative key. `None` when
/// there are none.
pub(crate) fn administrative_tier(
    record: &SourceRecord,
    location: &RecordLocation,
    index: &AreaIndex<'_>,
    config: &AssignerConfig,
    tags: TierTags,
) -> Option<AssignmentResult> {
    let candidates = index.query(location.key.as_ref()?);
    match candidates {
        [] => None,
        [only] => Some(AssignmentResult::new(only.code.clone(), tags.unique)),
        _ => {
            let (key, tag) = match config.present(record.neighborhood.as_deref()) {
                Some(neighborhood) => (neighborhood, tags.by_neighborhood),
                None => (record.id.as_str(), tags.by_key),
            };
            pick(key, candidates)
                .ok()
                .map(|unit| AssignmentResult::new(unit.code.clone(), tag))
        }
    }
}

/// Tier 3: every unit of the record's state, keyed by the record id.
pub(crate) fn region_tier(
    record: &SourceRecord,
    location: &RecordLocation,
    index: &AreaIndex<'_>,
    tags: TierTags,
) -> Option<AssignmentResult> {
    let pool = index.state_pool(location.state.as_deref()?);
    if pool.is_empty() {
        return None;
    }
    pick(&record.id, pool)
        .ok()
        .map(|unit| AssignmentResult::new(unit.code.clone(), tags.region))
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// What happened on the way to a result, folded into `Diagnostics`.
#[derive(Debug, Clone, Copy, Default)]
struct Trace {
    centroid_miss: bool,
    containment_miss: bool,
    multi_containment: bool,
}

/// Read-only snapshot of everything the cascade consults.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionCascade<'a> {
    config: &'a AssignerConfig,
    index: &'a AreaIndex<'a>,
    centroids: &'a CentroidTable,
    locator: &'a SpatialLocator,
}

impl<'a> ResolutionCascade<'a> {
    pub fn new(
        config: &'a AssignerConfig,
        index: &'a AreaIndex<'a>,
        centroids: &'a CentroidTable,
        locator: &'a SpatialLocator,
    ) -> Self {
        Self { config, index, centroids, locator }
    }

    /// Resolves one record. Always yields a result.
    pub fn resolve(&self, record: &SourceRecord) -> AssignmentResult {
        self.resolve_traced(record).0
    }

    /// Resolves every record, in order, and counts what each tier did.
    pub fn resolve_batch(&self, records: &[SourceRecord]) -> (Vec<AssignmentResult>, Diagnostics) {
        let traced = map_indexed(records.len(), |i| self.resolve_traced(&records[i]));

        let mut diagnostics = Diagnostics::default();
        let mut results = Vec::with_capacity(traced.len());
        for (result, trace) in traced {
            diagnostics.record(result.method);
            diagnostics.centroid_misses += trace.centroid_miss as usize;
            diagnostics.containment_misses += trace.containment_miss as usize;
            diagnostics.multi_containment += trace.multi_containment as usize;
            results.push(result);
        }
        if diagnostics.multi_containment > 0 {
            warn!(
                lookups = diagnostics.multi_containment,
                "centroids contained by more than one polygon"
            );
        }
        debug!(
            records = records.len(),
            unresolved = diagnostics.count(MethodTag::Unresolved),
            "cascade finished"
        );
        (results, diagnostics)
    }

    fn resolve_traced(&self, record: &SourceRecord) -> (AssignmentResult, Trace) {
        let mut trace = Trace::default();

        if let Some(code) = self.config.present(record.existing_code.as_deref()) {
            return (AssignmentResult::new(code, MethodTag::PreAssigned), trace);
        }

        match spatial_containment(record.postal_code.as_deref(), self.centroids, self.locator) {
            SpatialOutcome::Contained { hit, at } => {
                trace.multi_containment = hit.containing > 1;
                let result = AssignmentResult::located(hit.code, MethodTag::SpatialContainment, at);
                return (result, trace);
            }
            SpatialOutcome::NoCentroid => trace.centroid_miss = true,
            SpatialOutcome::NotContained(_) => trace.containment_miss = true,
            SpatialOutcome::Inapplicable => {}
        }

        let location = locate_record(record, self.config);
        let result = administrative_tier(record, &location, self.index, self.config, CASCADE_TAGS)
            .or_else(|| region_tier(record, &location, self.index, CASCADE_TAGS))
            .unwrap_or_else(AssignmentResult::unresolved);
        trace!(id = %record.id, method = %result.method, code = %result.code, "resolved");
        (result, trace)
    }
}
