//! The full batch: cascade, then correction, then postal normalization.

use tracing::info;

use crate::cascade::ResolutionCascade;
use crate::catalog::AreaCatalog;
use crate::centroid::CentroidTable;
use crate::config::AssignerConfig;
use crate::correction::CorrectionPass;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::index::AreaIndex;
use crate::locator::SpatialLocator;
use crate::model::{AssignmentResult, SourceRecord};
use crate::postal::{NormalizedBatch, PostalNormalizer};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub records: Vec<SourceRecord>,
    pub results: Vec<AssignmentResult>,
    /// Merged over all passes; method counts reflect the final pass.
    pub diagnostics: Diagnostics,
}

/// Locator the postal normalizer retries against: urban units only when
/// `urban_postal_locator` is set, otherwise `None` (reuse the full one).
pub fn postal_locator(catalog: &AreaCatalog, config: &AssignerConfig) -> Option<SpatialLocator> {
    config
        .urban_postal_locator
        .then(|| SpatialLocator::build(catalog.units.iter().filter(|u| u.is_urban()), false))
}

/// Runs every pass over `records` in order. With `require_urban`, the postal
/// retry never replaces a result with one the correction pass would reject.
pub fn run_pipeline(
    records: &[SourceRecord],
    catalog: &AreaCatalog,
    centroids: &CentroidTable,
    config: &AssignerConfig,
) -> Result<PipelineOutput> {
    let index = AreaIndex::build(&catalog.units, false);
    let locator = SpatialLocator::build(&catalog.units, config.validate_overlaps);
    let cascade = ResolutionCascade::new(config, &index, centroids, &locator);
    let (assigned, cascade_diag) = cascade.resolve_batch(records);

    let correction = CorrectionPass::new(&catalog.units, config);
    let (corrected, correction_diag) = correction.apply(records, &assigned)?;

    let urban = postal_locator(catalog, config);
    let mut normalizer =
        PostalNormalizer::new(config, centroids, urban.as_ref().unwrap_or(&locator));
    if config.require_urban {
        normalizer = normalizer.accepting(&correction);
    }
    let NormalizedBatch { records, results, diagnostics: postal_diag } =
        normalizer.apply(records, &corrected)?;

    let mut diagnostics = cascade_diag.merged(&correction_diag).merged(&postal_diag);
    // Per-tag counts of earlier passes describe intermediate states.
    diagnostics.methods = postal_diag.methods;
    diagnostics.geometry_failures = catalog.stats.geometry_failures;
    diagnostics.overlapping_pairs = locator.overlapping_pairs();

    info!(
        records = records.len(),
        corrections = diagnostics.corrections_applied,
        postal_reassigned = diagnostics.postal_reassigned,
        "pipeline finished"
    );
    Ok(PipelineOutput { records, results, diagnostics })
}
