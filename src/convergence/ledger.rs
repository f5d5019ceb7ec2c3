//! # Drift Ledger
//!
//! Typed view over the "last applied" record of sub-resources.
//!
//! The remote provider cannot tell which sub-resources this controller created
//! once they disappear from the declared spec, so the controller keeps its own
//! record in an annotation of the owning object. The annotation holds a JSON
//! object mapping parent resource name to an object of sub-resource name to
//! the sub-resource payload as it was last applied.

use crate::convergence::error::LedgerError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Annotation-backed key/value store holding JSON objects
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the annotation `key` as a JSON object, empty when unset.
    ///
    /// # Errors
    /// Returns an error if the annotation cannot be read or decoded.
    async fn annotation_json(&self, key: &str) -> Result<Map<String, Value>, LedgerError>;

    /// Replace the annotation `key` with `value`.
    ///
    /// # Errors
    /// Returns an error if the annotation cannot be written.
    async fn update_annotation_json(
        &self,
        key: &str,
        value: Map<String, Value>,
    ) -> Result<(), LedgerError>;
}

/// Last-applied sub-resources of every parent tracked under one annotation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastAppliedState {
    entries: Map<String, Value>,
}

impl LastAppliedState {
    #[must_use]
    pub fn from_json(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn into_json(self) -> Map<String, Value> {
        self.entries
    }

    /// Sub-resources last applied for `parent`. An absent entry, or one that
    /// is not a JSON object, reads as empty.
    #[must_use]
    pub fn sub_resources(&self, parent: &str) -> BTreeMap<String, Value> {
        match self.entries.get(parent) {
            Some(Value::Object(rules)) => rules
                .iter()
                .map(|(name, payload)| (name.clone(), payload.clone()))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Replace the entry of `parent`
    pub fn replace(&mut self, parent: &str, sub_resources: BTreeMap<String, Value>) {
        let entry: Map<String, Value> = sub_resources.into_iter().collect();
        self.entries.insert(parent.to_string(), Value::Object(entry));
    }
}

/// Reads and writes [`LastAppliedState`] under one annotation key
#[derive(Debug)]
pub struct DriftLedger<'a, L: ?Sized> {
    store: &'a L,
    key: &'a str,
}

impl<'a, L: LedgerStore + ?Sized> DriftLedger<'a, L> {
    pub fn new(store: &'a L, key: &'a str) -> Self {
        Self { store, key }
    }

    /// # Errors
    /// Returns an error if the annotation cannot be read or decoded.
    pub async fn load(&self) -> Result<LastAppliedState, LedgerError> {
        let entries = self.store.annotation_json(self.key).await?;
        Ok(LastAppliedState::from_json(entries))
    }

    /// # Errors
    /// Returns an error if the annotation cannot be written.
    pub async fn store(&self, state: LastAppliedState) -> Result<(), LedgerError> {
        self.store
            .update_annotation_json(self.key, state.into_json())
            .await
    }
}

/// Decode an annotation value into a JSON object. Empty values read as an
/// empty object.
///
/// # Errors
/// Returns [`LedgerError::Decode`] if the value is not a JSON object.
pub fn decode_annotation(key: &str, raw: Option<&str>) -> Result<Map<String, Value>, LedgerError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Map::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|source| LedgerError::Decode {
            key: key.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sub_resources_of_missing_parent_is_empty() {
        let state = LastAppliedState::default();
        assert!(state.sub_resources("node-nsg").is_empty());
    }

    #[test]
    fn test_non_object_entry_reads_as_empty() {
        let state = LastAppliedState::from_json(
            json!({"node-nsg": "not-an-object"}).as_object().unwrap().clone(),
        );
        assert!(state.sub_resources("node-nsg").is_empty());
    }

    #[test]
    fn test_replace_keeps_other_parents() {
        let mut state = LastAppliedState::from_json(
            json!({
                "node-nsg": {"allow_ssh": {"name": "allow_ssh"}},
                "cp-nsg": {"allow_apiserver": {"name": "allow_apiserver"}}
            })
            .as_object()
            .unwrap()
            .clone(),
        );

        let mut rules = BTreeMap::new();
        rules.insert("allow_http".to_string(), json!({"name": "allow_http"}));
        state.replace("node-nsg", rules);

        assert_eq!(
            Value::Object(state.into_json()),
            json!({
                "node-nsg": {"allow_http": {"name": "allow_http"}},
                "cp-nsg": {"allow_apiserver": {"name": "allow_apiserver"}}
            })
        );
    }

    #[test]
    fn test_decode_annotation() {
        assert!(decode_annotation("k", None).unwrap().is_empty());
        assert!(decode_annotation("k", Some("  ")).unwrap().is_empty());
        assert_eq!(
            decode_annotation("k", Some(r#"{"a":{}}"#)).unwrap().len(),
            1
        );

        let err = decode_annotation("k", Some("[1,2]")).unwrap_err();
        assert!(matches!(err, LedgerError::Decode { .. }));
    }
}
