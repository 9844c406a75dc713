//! Second pass over finished results: anything that is not a canonical
//! urban code is re-resolved against the urban-only index.

use tracing::debug;

use crate::admin::locate_record;
use crate::batch::map_indexed;
use crate::cascade::{administrative_tier, region_tier, TierTags};
use crate::config::AssignerConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{AgebError, Result};
use crate::index::AreaIndex;
use crate::model::{AreaUnit, AssignmentResult, MethodTag, SourceRecord, CANONICAL_CODE_LEN};

const CORRECTION_TAGS: TierTags = TierTags {
    unique: MethodTag::CorrectedAdministrative,
    by_neighborhood: MethodTag::CorrectedAdministrative,
    by_key: MethodTag::CorrectedAdministrative,
    region: MethodTag::CorrectedRegion,
};

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Valid,
    Corrected(AssignmentResult),
    Unfixable,
}

#[derive(Debug, Clone)]
pub struct CorrectionPass<'a> {
    config: &'a AssignerConfig,
    strict: AreaIndex<'a>,
}

impl<'a> CorrectionPass<'a> {
    /// Builds the urban-only index over `units`.
    pub fn new(units: &'a [AreaUnit], config: &'a AssignerConfig) -> Self {
        Self {
            config,
            strict: AreaIndex::build(units, true),
        }
    }

    /// Canonical length, and an urban unit when `require_urban` is set.
    pub fn is_valid(&self, result: &AssignmentResult) -> bool {
        if result.code.chars().count() != CANONICAL_CODE_LEN {
            return false;
        }
        !self.config.require_urban || self.strict.unit(&result.code).is_some()
    }

    /// Returns a new result set where every invalid entry that the strict
    /// index can fix has been re-resolved. Valid entries are cloned as is.
    pub fn apply(
        &self,
        records: &[SourceRecord],
        results: &[AssignmentResult],
    ) -> Result<(Vec<AssignmentResult>, Diagnostics)> {
        if records.len() != results.len() {
            return Err(AgebError::InvalidArgument(format!(
                "{} records but {} results",
                records.len(),
                results.len()
            )));
        }

        let outcomes = map_indexed(records.len(), |i| self.correct(&records[i], &results[i]));

        let mut diagnostics = Diagnostics::default();
        let mut corrected = Vec::with_capacity(results.len());
        for (outcome, original) in outcomes.into_iter().zip(results) {
            let result = match outcome {
                Outcome::Valid => original.clone(),
                Outcome::Unfixable => {
                    diagnostics.corrections_unresolved += 1;
                    original.clone()
                }
                Outcome::Corrected(result) => {
                    if &result != original {
                        diagnostics.corrections_applied += 1;
                    }
                    result
                }
            };
            diagnostics.record(result.method);
            corrected.push(result);
        }
        debug!(
            applied = diagnostics.corrections_applied,
            unfixable = diagnostics.corrections_unresolved,
            "correction pass finished"
        );
        Ok((corrected, diagnostics))
    }

    fn correct(&self, record: &SourceRecord, result: &AssignmentResult) -> Outcome {
        if self.is_valid(result) {
            return Outcome::Valid;
        }
        let location = locate_record(record, self.config);
        administrative_tier(record, &location, &self.strict, self.config, CORRECTION_TAGS)
            .or_else(|| region_tier(record, &location, &self.strict, CORRECTION_TAGS))
            .map_or(Outcome::Unfixable, Outcome::Corrected)
    }
}
