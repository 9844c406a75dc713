//! Per-pass counters and the batch quality summary.
//!
//! Counters are plain values returned by each pass; callers merge them.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::model::{AssignmentResult, MethodTag};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Results emitted per method tag.
    pub methods: BTreeMap<MethodTag, usize>,
    /// Tier 1 applicable but the postal code has no centroid.
    pub centroid_misses: usize,
    /// Centroid found but no polygon contains it.
    pub containment_misses: usize,
    /// Lookups where more than one polygon contained the point.
    pub multi_containment: usize,
    pub geometry_failures: usize,
    pub overlapping_pairs: usize,
    /// Results rewritten by the correction pass.
    pub corrections_applied: usize,
    /// Results failing validity with no stricter candidate available.
    pub corrections_unresolved: usize,
    /// 4-digit postal codes padded to 5.
    pub postal_codes_normalized: usize,
    pub postal_reassigned: usize,
    pub postal_without_centroid: usize,
    pub postal_without_containment: usize,
    /// Retried hits refused by the validity predicate.
    pub postal_rejected: usize,
}

impl Diagnostics {
    pub fn record(&mut self, tag: MethodTag) {
        *self.methods.entry(tag).or_default() += 1;
    }

    pub fn count(&self, tag: MethodTag) -> usize {
        self.methods.get(&tag).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &Diagnostics) {
        for (tag, n) in &other.methods {
            *self.methods.entry(*tag).or_default() += n;
        }
        self.centroid_misses += other.centroid_misses;
        self.containment_misses += other.containment_misses;
        self.multi_containment += other.multi_containment;
        self.geometry_failures += other.geometry_failures;
        self.overlapping_pairs += other.overlapping_pairs;
        self.corrections_applied += other.corrections_applied;
        self.corrections_unresolved += other.corrections_unresolved;
        self.postal_codes_normalized += other.postal_codes_normalized;
        self.postal_reassigned += other.postal_reassigned;
        self.postal_without_centroid += other.postal_without_centroid;
        self.postal_without_containment += other.postal_without_containment;
        self.postal_rejected += other.postal_rejected;
    }

    pub fn merged(mut self, other: &Diagnostics) -> Self {
        self.merge(other);
        self
    }
}

/// Quality summary over a finished result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub assigned: usize,
    pub unresolved: usize,
    pub distinct_codes: usize,
    /// Mean records per distinct code; 0 when nothing was assigned.
    pub mean_per_code: f64,
    /// Code length -> number of assigned results.
    pub code_lengths: BTreeMap<usize, usize>,
    pub with_coordinates: usize,
    pub methods: BTreeMap<MethodTag, usize>,
}

impl BatchReport {
    pub fn summarize(results: &[AssignmentResult]) -> Self {
        let mut code_lengths = BTreeMap::new();
        let mut methods = BTreeMap::new();
        let mut distinct = HashSet::new();
        let mut with_coordinates = 0usize;

        for r in results {
            *methods.entry(r.method).or_default() += 1;
            if r.coordinate.is_some() {
                with_coordinates += 1;
            }
            if r.is_resolved() {
                *code_lengths.entry(r.code.chars().count()).or_default() += 1;
                distinct.insert(r.code.as_str());
            }
        }

        let assigned: usize = code_lengths.values().sum();
        let mean_per_code = if distinct.is_empty() {
            0.0
        } else {
            assigned as f64 / distinct.len() as f64
        };
        Self {
            total: results.len(),
            assigned,
            unresolved: results.len() - assigned,
            distinct_codes: distinct.len(),
            mean_per_code,
            code_lengths,
            with_coordinates,
            methods,
        }
    }
}
