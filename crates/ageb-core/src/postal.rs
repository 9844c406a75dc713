//! Repair of 4-character postal codes, with a retry of spatial containment.

use tracing::{debug, trace};

use crate::batch::map_indexed;
use crate::cascade::{spatial_containment, SpatialOutcome};
use crate::centroid::{CentroidTable, POSTAL_CODE_LEN};
use crate::config::AssignerConfig;
use crate::correction::CorrectionPass;
use crate::diagnostics::Diagnostics;
use crate::error::{AgebError, Result};
use crate::locator::SpatialLocator;
use crate::model::{AssignmentResult, MethodTag, SourceRecord};

/// Output of the normalizer: records with repaired postal codes and the
/// matching results.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<SourceRecord>,
    pub results: Vec<AssignmentResult>,
    pub diagnostics: Diagnostics,
}

/// Zero-prefixed form of a postal code one character short, if it is.
/// Expects an already trimmed code.
pub fn pad_postal_code(raw: &str) -> Option<String> {
    (raw.chars().count() == POSTAL_CODE_LEN - 1).then(|| format!("0{raw}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    NotNeeded,
    Reassigned,
    NoCentroid,
    NotContained,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub struct PostalNormalizer<'a> {
    config: &'a AssignerConfig,
    centroids: &'a CentroidTable,
    locator: &'a SpatialLocator,
    guard: Option<&'a CorrectionPass<'a>>,
}

impl<'a> PostalNormalizer<'a> {
    /// `locator` is the polygon set containment is retried against.
    pub fn new(
        config: &'a AssignerConfig,
        centroids: &'a CentroidTable,
        locator: &'a SpatialLocator,
    ) -> Self {
        Self { config, centroids, locator, guard: None }
    }

    /// Only accept retried hits that pass `pass`'s validity predicate.
    pub fn accepting(self, pass: &'a CorrectionPass<'a>) -> Self {
        Self { guard: Some(pass), ..self }
    }

    pub fn apply(
        &self,
        records: &[SourceRecord],
        results: &[AssignmentResult],
    ) -> Result<NormalizedBatch> {
        if records.len() != results.len() {
            return Err(AgebError::InvalidArgument(format!(
                "{} records but {} results",
                records.len(),
                results.len()
            )));
        }

        let repaired = map_indexed(records.len(), |i| self.normalize(&records[i], &results[i]));

        let mut batch = NormalizedBatch {
            records: Vec::with_capacity(records.len()),
            results: Vec::with_capacity(results.len()),
            diagnostics: Diagnostics::default(),
        };
        for (record, result, retry) in repaired {
            let diag = &mut batch.diagnostics;
            match retry {
                Retry::NotNeeded => {}
                Retry::Reassigned => diag.postal_reassigned += 1,
                Retry::NoCentroid => diag.postal_without_centroid += 1,
                Retry::NotContained => diag.postal_without_containment += 1,
                Retry::Rejected => diag.postal_rejected += 1,
            }
            if retry != Retry::NotNeeded {
                diag.postal_codes_normalized += 1;
            }
            diag.record(result.method);
            batch.records.push(record);
            batch.results.push(result);
        }
        debug!(
            normalized = batch.diagnostics.postal_codes_normalized,
            reassigned = batch.diagnostics.postal_reassigned,
            "postal normalization finished"
        );
        Ok(batch)
    }

    fn normalize(
        &self,
        record: &SourceRecord,
        result: &AssignmentResult,
    ) -> (SourceRecord, AssignmentResult, Retry) {
        let padded = self
            .config
            .present(record.postal_code.as_deref())
            .and_then(pad_postal_code);
        let Some(padded) = padded else {
            return (record.clone(), result.clone(), Retry::NotNeeded);
        };

        let outcome = spatial_containment(Some(&padded), self.centroids, self.locator);
        let (result, retry) = match outcome {
            SpatialOutcome::Contained { hit, at } => {
                let located = AssignmentResult::located(hit.code, MethodTag::CorrectedSpatial, at);
                match self.guard {
                    Some(pass) if !pass.is_valid(&located) => (result.clone(), Retry::Rejected),
                    _ => (located, Retry::Reassigned),
                }
            }
            SpatialOutcome::NotContained(_) => (result.clone(), Retry::NotContained),
            SpatialOutcome::NoCentroid | SpatialOutcome::Inapplicable => {
                (result.clone(), Retry::NoCentroid)
            }
        };
        trace!(id = %record.id, postal_code = %padded, ?retry, "postal code padded");

        let record = SourceRecord {
            postal_code: Some(padded),
            ..record.clone()
        };
        (record, result, retry)
    }
}
