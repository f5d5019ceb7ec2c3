//! # Cluster Scope
//!
//! In-memory view of the object that owns a cluster's network. Passes read
//! and mutate it; the caller persists the result with
//! [`ObjectPatcher`](crate::scope::ObjectPatcher) once the pass returns.

use crate::convergence::{
    decode_annotation, AsyncStatusUpdater, ConvergenceError, LedgerError, LedgerStore,
    ManagedGate, SpecSource,
};
use crate::crd::{ClusterNetwork, Condition, LongRunningOperationState, NetworkStatus, OperationKind};
use crate::scope::conditions::{delete_condition, find_condition, put_condition, set_condition};
use crate::services::securitygroups::{nsg_specs, NsgSpec};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Mutable part of the owning object
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectState {
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub status: NetworkStatus,
}

#[derive(Debug)]
pub struct ClusterScope {
    network: ClusterNetwork,
    state: Mutex<ObjectState>,
}

impl ClusterScope {
    #[must_use]
    pub fn new(network: ClusterNetwork, state: ObjectState) -> Self {
        Self {
            network,
            state: Mutex::new(state),
        }
    }

    #[must_use]
    pub fn network(&self) -> &ClusterNetwork {
        &self.network
    }

    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.network.cluster_name
    }

    #[must_use]
    pub fn is_vnet_managed(&self) -> bool {
        self.network.network_spec.vnet.is_managed(&self.network.cluster_name)
    }

    #[must_use]
    pub fn nsg_specs(&self) -> Vec<NsgSpec> {
        nsg_specs(&self.network)
    }

    /// Copy of the current state, for persisting
    #[must_use]
    pub fn snapshot(&self) -> ObjectState {
        self.lock().clone()
    }

    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<String> {
        self.lock().annotations.get(key).cloned()
    }

    #[must_use]
    pub fn condition(&self, condition_type: &str) -> Option<Condition> {
        find_condition(&self.lock().status.conditions, condition_type).cloned()
    }

    // A poisoned lock still holds consistent data: every mutation below is a
    // single insert or replace.
    fn lock(&self) -> MutexGuard<'_, ObjectState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ManagedGate for ClusterScope {
    async fn is_managed(&self) -> anyhow::Result<bool> {
        Ok(self.is_vnet_managed())
    }
}

#[async_trait]
impl LedgerStore for ClusterScope {
    async fn annotation_json(&self, key: &str) -> Result<Map<String, Value>, LedgerError> {
        let raw = self.annotation(key);
        decode_annotation(key, raw.as_deref())
    }

    async fn update_annotation_json(
        &self,
        key: &str,
        value: Map<String, Value>,
    ) -> Result<(), LedgerError> {
        let encoded =
            serde_json::to_string(&Value::Object(value)).map_err(|e| LedgerError::Write {
                key: key.to_string(),
                source: e.into(),
            })?;
        self.lock().annotations.insert(key.to_string(), encoded);
        Ok(())
    }
}

impl AsyncStatusUpdater for ClusterScope {
    fn set_long_running_operation_state(&self, state: LongRunningOperationState) {
        let mut guard = self.lock();
        let states = &mut guard.status.long_running_operation_states;
        states.retain(|s| !s.matches(&state.resource_name, &state.service_name, state.kind));
        states.push(state);
    }

    fn get_long_running_operation_state(
        &self,
        resource_name: &str,
        service_name: &str,
        kind: OperationKind,
    ) -> Option<LongRunningOperationState> {
        self.lock()
            .status
            .long_running_operation_states
            .iter()
            .find(|s| s.matches(resource_name, service_name, kind))
            .cloned()
    }

    fn delete_long_running_operation_state(
        &self,
        resource_name: &str,
        service_name: &str,
        kind: OperationKind,
    ) {
        self.lock()
            .status
            .long_running_operation_states
            .retain(|s| !s.matches(resource_name, service_name, kind));
    }

    fn update_put_status(&self, condition: &str, service_name: &str, err: Option<&ConvergenceError>) {
        let condition = put_condition(condition, service_name, err, Utc::now());
        debug!(
            "Setting condition {} to {:?} ({})",
            condition.r#type,
            condition.status,
            condition.reason.as_deref().unwrap_or("")
        );
        set_condition(&mut self.lock().status.conditions, condition);
    }

    fn update_delete_status(
        &self,
        condition: &str,
        service_name: &str,
        err: Option<&ConvergenceError>,
    ) {
        let condition = delete_condition(condition, service_name, err, Utc::now());
        debug!(
            "Setting condition {} to {:?} ({})",
            condition.r#type,
            condition.status,
            condition.reason.as_deref().unwrap_or("")
        );
        set_condition(&mut self.lock().status.conditions, condition);
    }
}

impl SpecSource<NsgSpec> for ClusterScope {
    fn specs(&self) -> Vec<NsgSpec> {
        self.nsg_specs()
    }
}
