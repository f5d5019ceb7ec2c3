//! # Sub-Resource Differ
//!
//! Compares the declared sub-resources of a parent with the ledger's last
//! applied set, and merges declared sub-resources into the remote list.

use crate::convergence::error::LedgerError;
use crate::convergence::ledger::LastAppliedState;
use crate::convergence::spec::ParentResourceSpec;
use serde_json::Value;
use std::collections::BTreeMap;

/// What changed between the last applied and the declared sub-resources of one parent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriftPlan {
    /// Declared sub-resources flagged `managed_always`, keyed by name
    pub declared: BTreeMap<String, Value>,
    /// Declared but never applied
    pub added: Vec<String>,
    /// Declared and previously applied with the same payload
    pub unchanged: Vec<String>,
    /// Declared and previously applied with a different payload
    pub changed: Vec<String>,
    /// Previously applied and no longer declared; must be deleted remotely
    pub removed: Vec<String>,
}

impl DriftPlan {
    /// Build the plan for `spec` against the ledger.
    ///
    /// Only `managed_always` sub-resources take part: others are neither
    /// recorded nor deleted.
    ///
    /// # Errors
    /// Returns an error if a sub-resource payload cannot be serialized.
    pub fn compute<S: ParentResourceSpec + ?Sized>(
        spec: &S,
        last_applied: &LastAppliedState,
    ) -> Result<Self, LedgerError> {
        let mut declared = BTreeMap::new();
        for sub_resource in spec.sub_resources().iter().filter(|s| s.managed_always) {
            let payload =
                serde_json::to_value(&sub_resource.payload).map_err(|source| LedgerError::Encode {
                    parent: spec.resource_name().to_string(),
                    name: sub_resource.name.clone(),
                    source,
                })?;
            declared.insert(sub_resource.name.clone(), payload);
        }

        let previous = last_applied.sub_resources(spec.resource_name());

        let mut plan = DriftPlan::default();
        for (name, payload) in &declared {
            match previous.get(name) {
                None => plan.added.push(name.clone()),
                Some(applied) if applied == payload => plan.unchanged.push(name.clone()),
                Some(_) => plan.changed.push(name.clone()),
            }
        }
        plan.removed = previous
            .keys()
            .filter(|name| !declared.contains_key(*name))
            .cloned()
            .collect();
        plan.declared = declared;

        Ok(plan)
    }

    /// Record the declared set as last applied for `parent`.
    ///
    /// An empty declared set leaves the existing entry untouched, so removed
    /// sub-resources stay in the ledger and their deletion is retried every pass.
    pub fn apply(&self, parent: &str, state: &mut LastAppliedState) {
        if !self.declared.is_empty() {
            state.replace(parent, self.declared.clone());
        }
    }

    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Union `declared` into `existing`, appending each declared item that no
/// existing item matches. Returns `None` when every declared item already
/// matched, meaning the parent needs no update.
pub fn union_missing<T, I, F>(existing: &[T], declared: I, matches: F) -> Option<Vec<T>>
where
    T: Clone,
    I: IntoIterator<Item = T>,
    F: Fn(&[T], &T) -> bool,
{
    let mut merged = existing.to_vec();
    let mut update = false;
    for item in declared {
        if !matches(&merged, &item) {
            update = true;
            merged.push(item);
        }
    }
    update.then_some(merged)
}
