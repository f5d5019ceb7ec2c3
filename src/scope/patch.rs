//! # Object Patching
//!
//! Loads the state of the owning Kubernetes object into a scope and writes
//! the scope's changes back with merge patches.

use crate::crd::NetworkStatus;
use crate::scope::cluster::ObjectState;
use anyhow::{Context, Result};
use kube::api::{Api, Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt::{self, Debug};
use tracing::debug;

/// Patches annotations and status of namespaced objects of kind `K`
pub struct ObjectPatcher<K> {
    api: Api<K>,
    field_manager: String,
}

impl<K> fmt::Debug for ObjectPatcher<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPatcher")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl<K> ObjectPatcher<K>
where
    K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned,
    <K as Resource>::DynamicType: Default,
{
    #[must_use]
    pub fn new(client: Client, namespace: &str, field_manager: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            field_manager: field_manager.to_string(),
        }
    }

    /// Read annotations and status of `name`
    ///
    /// # Errors
    /// Returns an error if the object cannot be fetched or its status cannot be decoded.
    pub async fn load_state(&self, name: &str) -> Result<ObjectState> {
        let object = self
            .api
            .get(name)
            .await
            .with_context(|| format!("Failed to get object {name}"))?;
        let annotations = object.meta().annotations.clone().unwrap_or_default();

        let value = serde_json::to_value(&object)
            .with_context(|| format!("Failed to serialize object {name}"))?;
        let status = match value.get("status") {
            Some(status) if !status.is_null() => {
                serde_json::from_value::<NetworkStatus>(status.clone())
                    .with_context(|| format!("Failed to decode status of object {name}"))?
            }
            _ => NetworkStatus::default(),
        };

        Ok(ObjectState {
            annotations: annotations.into_iter().collect(),
            status,
        })
    }

    /// Write back what changed between `previous` and `current`
    ///
    /// # Errors
    /// Returns an error if a patch is rejected.
    pub async fn persist(&self, name: &str, previous: &ObjectState, current: &ObjectState) -> Result<()> {
        let params = PatchParams::apply(&self.field_manager);

        if let Some(patch) = annotations_patch(previous, current) {
            self.api
                .patch(name, &params, &Patch::Merge(&patch))
                .await
                .with_context(|| format!("Failed to patch annotations of object {name}"))?;
            debug!("Patched annotations of object {}", name);
        }

        if previous.status != current.status {
            let patch = status_patch(current)?;
            self.api
                .patch_status(name, &params, &Patch::Merge(&patch))
                .await
                .with_context(|| format!("Failed to patch status of object {name}"))?;
            debug!("Patched status of object {}", name);
        }

        Ok(())
    }
}

/// Merge patch setting changed annotations and removing deleted ones, `None`
/// when nothing changed
#[must_use]
pub fn annotations_patch(previous: &ObjectState, current: &ObjectState) -> Option<Value> {
    let mut changes = Map::new();
    for (key, value) in &current.annotations {
        if previous.annotations.get(key) != Some(value) {
            changes.insert(key.clone(), Value::String(value.clone()));
        }
    }
    for key in previous.annotations.keys() {
        if !current.annotations.contains_key(key) {
            changes.insert(key.clone(), Value::Null);
        }
    }

    if changes.is_empty() {
        None
    } else {
        Some(json!({ "metadata": { "annotations": changes } }))
    }
}

/// Merge patch replacing the conditions and in-flight operations.
///
/// Both lists are always sent so that cleared operations are removed.
///
/// # Errors
/// Returns an error if the status cannot be serialized.
pub fn status_patch(current: &ObjectState) -> Result<Value> {
    Ok(json!({
        "status": {
            "conditions": serde_json::to_value(&current.status.conditions)?,
            "longRunningOperationStates": serde_json::to_value(&current.status.long_running_operation_states)?,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{LongRunningOperationState, OperationKind};
    use chrono::Utc;

    #[test]
    fn test_annotations_patch_only_carries_changes() {
        let mut previous = ObjectState::default();
        previous.annotations.insert("keep".to_string(), "1".to_string());
        previous.annotations.insert("gone".to_string(), "2".to_string());

        let mut current = ObjectState::default();
        current.annotations.insert("keep".to_string(), "1".to_string());
        current.annotations.insert("new".to_string(), "3".to_string());

        let patch = annotations_patch(&previous, &current).unwrap();
        assert_eq!(
            patch,
            json!({"metadata": {"annotations": {"new": "3", "gone": null}}})
        );

        assert!(annotations_patch(&current, &current).is_none());
    }

    #[test]
    fn test_status_patch_sends_empty_operation_list() {
        let mut state = ObjectState::default();
        let patch = status_patch(&state).unwrap();
        assert_eq!(patch["status"]["longRunningOperationStates"], json!([]));

        state
            .status
            .long_running_operation_states
            .push(LongRunningOperationState {
                resource_name: "node-nsg".to_string(),
                resource_group: "my-rg".to_string(),
                service_name: "securitygroups".to_string(),
                kind: OperationKind::Put,
                resume_token: "token".to_string(),
                started_at: Utc::now(),
            });
        let patch = status_patch(&state).unwrap();
        assert_eq!(
            patch["status"]["longRunningOperationStates"][0]["type"],
            "PUT"
        );
    }
}
