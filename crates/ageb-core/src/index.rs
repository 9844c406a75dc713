//! Area units grouped by administrative key and by state.

use std::collections::HashMap;

use crate::model::{AdministrativeKey, AreaUnit};

/// Borrowing lookup over a slice of area units. Every list keeps source
/// order, which the distributor relies on for reproducible picks.
#[derive(Debug, Clone)]
pub struct AreaIndex<'a> {
    urban_only: bool,
    by_key: HashMap<AdministrativeKey, Vec<&'a AreaUnit>>,
    by_state: HashMap<String, Vec<&'a AreaUnit>>,
    by_code: HashMap<&'a str, &'a AreaUnit>,
}

impl<'a> AreaIndex<'a> {
    /// Groups `units`; with `urban_only` rural units are left out.
    pub fn build(units: &'a [AreaUnit], urban_only: bool) -> Self {
        let mut by_key: HashMap<AdministrativeKey, Vec<&'a AreaUnit>> = HashMap::new();
        let mut by_state: HashMap<String, Vec<&'a AreaUnit>> = HashMap::new();
        let mut by_code = HashMap::with_capacity(units.len());

        for unit in units.iter().filter(|u| !urban_only || u.is_urban()) {
            by_key.entry(unit.key.clone()).or_default().push(unit);
            by_state.entry(unit.key.state.clone()).or_default().push(unit);
            by_code.entry(unit.code.as_str()).or_insert(unit);
        }

        Self { urban_only, by_key, by_state, by_code }
    }

    /// Units under `key`; empty when the key is unknown.
    pub fn query(&self, key: &AdministrativeKey) -> &[&'a AreaUnit] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every unit of a state, regardless of municipality.
    pub fn state_pool(&self, state: &str) -> &[&'a AreaUnit] {
        self.by_state.get(state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Unit by exact code, if it is part of this index.
    pub fn unit(&self, code: &str) -> Option<&'a AreaUnit> {
        self.by_code.get(code).copied()
    }

    pub fn is_urban_only(&self) -> bool {
        self.urban_only
    }

    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    pub fn unit_count(&self) -> usize {
        self.by_code.len()
    }
}
