//! Common test utilities for security group convergence tests
//!
//! Provides a recording fake of the remote network API, a scope wrapper that
//! counts ledger writes and can fail the managed check, and fixtures.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use async_trait::async_trait;
use security_group_controller::constants::{CLUSTER_TAG_PREFIX, SECURITY_RULE_LAST_APPLIED_ANNOTATION};
use security_group_controller::convergence::{
    AsyncResult, AsyncStatusUpdater, ClientError, ConvergenceError, LedgerError, LedgerStore,
    ManagedGate, OperationContext, ResourceClient, SpecSource, SubResourceClient,
};
use security_group_controller::crd::{
    ClusterNetwork, LongRunningOperationState, NetworkSpec, OperationKind, SecurityGroupProtocol,
    SecurityGroupSpec, SecurityRule, SecurityRuleAction, SecurityRuleDirection, SubnetSpec,
    VnetSpec,
};
use security_group_controller::scope::{ClusterScope, ObjectState};
use security_group_controller::services::securitygroups::{NsgSpec, SecurityGroup};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Install a test subscriber once per test binary
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "security_group_controller=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub const TIMEOUT: Duration = Duration::from_secs(12);

// Fixtures

pub fn ssh_rule() -> SecurityRule {
    SecurityRule {
        name: "allow_ssh".to_string(),
        description: "Allow SSH".to_string(),
        protocol: SecurityGroupProtocol::Tcp,
        direction: SecurityRuleDirection::Inbound,
        priority: 2200,
        source_ports: Some("*".to_string()),
        destination_ports: Some("22".to_string()),
        source: Some("*".to_string()),
        destination: Some("*".to_string()),
        action: SecurityRuleAction::Allow,
    }
}

pub fn other_rule() -> SecurityRule {
    SecurityRule {
        name: "other_rule".to_string(),
        description: "Test Rule".to_string(),
        protocol: SecurityGroupProtocol::Tcp,
        direction: SecurityRuleDirection::Inbound,
        priority: 500,
        source_ports: Some("*".to_string()),
        destination_ports: Some("80".to_string()),
        source: Some("*".to_string()),
        destination: Some("*".to_string()),
        action: SecurityRuleAction::Allow,
    }
}

/// Network with one subnet per `(security group, rules)` entry
pub fn network(owned: bool, groups: Vec<(&str, Vec<SecurityRule>)>) -> ClusterNetwork {
    let mut tags = BTreeMap::new();
    if owned {
        tags.insert(format!("{CLUSTER_TAG_PREFIX}my-cluster"), "owned".to_string());
    }

    ClusterNetwork {
        cluster_name: "my-cluster".to_string(),
        resource_group: "test-group".to_string(),
        location: "test-location".to_string(),
        additional_tags: BTreeMap::new(),
        network_spec: NetworkSpec {
            vnet: VnetSpec {
                resource_group: None,
                name: "my-vnet".to_string(),
                tags,
            },
            subnets: groups
                .into_iter()
                .map(|(name, rules)| SubnetSpec {
                    name: format!("{name}-subnet"),
                    role: None,
                    security_group: SecurityGroupSpec {
                        name: name.to_string(),
                        security_rules: rules,
                    },
                })
                .collect(),
        },
    }
}

/// Ledger annotation value mapping each security group to its rules
pub fn ledger(entries: Vec<(&str, Vec<SecurityRule>)>) -> Value {
    let mut map = Map::new();
    for (group, rules) in entries {
        let rules: Map<String, Value> = rules
            .into_iter()
            .map(|rule| (rule.name.clone(), serde_json::to_value(&rule).unwrap()))
            .collect();
        map.insert(group.to_string(), Value::Object(rules));
    }
    Value::Object(map)
}

pub fn put_operation(resource_name: &str, token: &str) -> LongRunningOperationState {
    operation(resource_name, OperationKind::Put, token)
}

pub fn delete_operation(resource_name: &str, token: &str) -> LongRunningOperationState {
    operation(resource_name, OperationKind::Delete, token)
}

fn operation(resource_name: &str, kind: OperationKind, token: &str) -> LongRunningOperationState {
    LongRunningOperationState {
        resource_name: resource_name.to_string(),
        resource_group: "test-group".to_string(),
        service_name: "securitygroups".to_string(),
        kind,
        resume_token: token.to_string(),
        started_at: chrono::Utc::now() - chrono::Duration::minutes(1),
    }
}

// Scope

/// Cluster scope that counts ledger writes and can fail the managed check
#[derive(Debug)]
pub struct TestScope {
    pub inner: ClusterScope,
    gate_error: Option<String>,
    ledger_reads: AtomicUsize,
    ledger_writes: AtomicUsize,
}

impl TestScope {
    pub fn new(network: ClusterNetwork) -> Self {
        Self::with_state(network, ObjectState::default())
    }

    pub fn with_ledger(network: ClusterNetwork, ledger: &Value) -> Self {
        let mut state = ObjectState::default();
        state.annotations.insert(
            SECURITY_RULE_LAST_APPLIED_ANNOTATION.to_string(),
            ledger.to_string(),
        );
        Self::with_state(network, state)
    }

    pub fn with_state(network: ClusterNetwork, state: ObjectState) -> Self {
        Self {
            inner: ClusterScope::new(network, state),
            gate_error: None,
            ledger_reads: AtomicUsize::new(0),
            ledger_writes: AtomicUsize::new(0),
        }
    }

    pub fn failing_gate(mut self, message: &str) -> Self {
        self.gate_error = Some(message.to_string());
        self
    }

    pub fn ledger_reads(&self) -> usize {
        self.ledger_reads.load(Ordering::SeqCst)
    }

    pub fn ledger_writes(&self) -> usize {
        self.ledger_writes.load(Ordering::SeqCst)
    }

    /// Current ledger annotation, decoded
    pub fn ledger(&self) -> Option<Value> {
        self.inner
            .annotation(SECURITY_RULE_LAST_APPLIED_ANNOTATION)
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

#[async_trait]
impl ManagedGate for TestScope {
    async fn is_managed(&self) -> anyhow::Result<bool> {
        match &self.gate_error {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => self.inner.is_managed().await,
        }
    }
}

#[async_trait]
impl LedgerStore for TestScope {
    async fn annotation_json(&self, key: &str) -> Result<Map<String, Value>, LedgerError> {
        self.ledger_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.annotation_json(key).await
    }

    async fn update_annotation_json(
        &self,
        key: &str,
        value: Map<String, Value>,
    ) -> Result<(), LedgerError> {
        self.ledger_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_annotation_json(key, value).await
    }
}

impl AsyncStatusUpdater for TestScope {
    fn set_long_running_operation_state(&self, state: LongRunningOperationState) {
        self.inner.set_long_running_operation_state(state);
    }

    fn get_long_running_operation_state(
        &self,
        resource_name: &str,
        service_name: &str,
        kind: OperationKind,
    ) -> Option<LongRunningOperationState> {
        self.inner
            .get_long_running_operation_state(resource_name, service_name, kind)
    }

    fn delete_long_running_operation_state(
        &self,
        resource_name: &str,
        service_name: &str,
        kind: OperationKind,
    ) {
        self.inner
            .delete_long_running_operation_state(resource_name, service_name, kind);
    }

    fn update_put_status(&self, condition: &str, service_name: &str, err: Option<&ConvergenceError>) {
        self.inner.update_put_status(condition, service_name, err);
    }

    fn update_delete_status(
        &self,
        condition: &str,
        service_name: &str,
        err: Option<&ConvergenceError>,
    ) {
        self.inner.update_delete_status(condition, service_name, err);
    }
}

impl SpecSource<NsgSpec> for TestScope {
    fn specs(&self) -> Vec<NsgSpec> {
        self.inner.nsg_specs()
    }
}

// Remote API

/// How the fake answers a write for one security group
#[derive(Debug, Clone)]
pub enum Behavior {
    Complete,
    Pending(String),
    Fail(String),
    /// Never returns; only the pass deadline ends the call
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(String),
    CreateOrUpdate {
        name: String,
        resume_token: Option<String>,
        parameters: Option<SecurityGroup>,
    },
    Delete {
        name: String,
        resume_token: Option<String>,
    },
    DeleteRule {
        group: String,
        rule: String,
    },
}

/// Recording fake of the remote network API
#[derive(Debug, Default)]
pub struct FakeNetworkClient {
    groups: Mutex<BTreeMap<String, SecurityGroup>>,
    put_behavior: Mutex<HashMap<String, Behavior>>,
    delete_behavior: Mutex<HashMap<String, Behavior>>,
    get_failures: Mutex<HashMap<String, String>>,
    failing_rule_deletes: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    writes: AtomicUsize,
}

impl FakeNetworkClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_group(&self, name: &str, group: SecurityGroup) {
        self.groups.lock().unwrap().insert(name.to_string(), group);
    }

    pub fn group(&self, name: &str) -> Option<SecurityGroup> {
        self.groups.lock().unwrap().get(name).cloned()
    }

    pub fn on_put(&self, name: &str, behavior: Behavior) {
        self.put_behavior
            .lock()
            .unwrap()
            .insert(name.to_string(), behavior);
    }

    pub fn on_delete(&self, name: &str, behavior: Behavior) {
        self.delete_behavior
            .lock()
            .unwrap()
            .insert(name.to_string(), behavior);
    }

    pub fn fail_get(&self, name: &str, message: &str) {
        self.get_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), message.to_string());
    }

    pub fn fail_rule_delete(&self, rule: &str) {
        self.failing_rule_deletes
            .lock()
            .unwrap()
            .insert(rule.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_or_update_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::CreateOrUpdate { .. }))
            .collect()
    }

    pub fn deleted_rules(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeleteRule { group, rule } => Some((group, rule)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn behavior(map: &Mutex<HashMap<String, Behavior>>, name: &str) -> Behavior {
        map.lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(Behavior::Complete)
    }
}

#[async_trait]
impl ResourceClient<NsgSpec> for FakeNetworkClient {
    async fn get(&self, _ctx: &OperationContext, spec: &NsgSpec) -> Result<SecurityGroup, ClientError> {
        self.record(Call::Get(spec.name.clone()));
        let failure = self.get_failures.lock().unwrap().get(&spec.name).cloned();
        if let Some(message) = failure {
            return Err(ClientError::Request(anyhow::anyhow!(message)));
        }
        self.group(&spec.name).ok_or(ClientError::NotFound)
    }

    async fn create_or_update_async(
        &self,
        _ctx: &OperationContext,
        spec: &NsgSpec,
        resume_token: Option<&str>,
        parameters: Option<SecurityGroup>,
    ) -> Result<AsyncResult<SecurityGroup>, ClientError> {
        self.record(Call::CreateOrUpdate {
            name: spec.name.clone(),
            resume_token: resume_token.map(str::to_string),
            parameters: parameters.clone(),
        });

        match Self::behavior(&self.put_behavior, &spec.name) {
            Behavior::Complete => {
                let stored = match parameters {
                    Some(mut group) => {
                        let version = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
                        group.etag = Some(format!("etag-{version}"));
                        self.insert_group(&spec.name, group.clone());
                        group
                    }
                    None => self.group(&spec.name).unwrap_or_else(|| SecurityGroup {
                        name: Some(spec.name.clone()),
                        ..SecurityGroup::default()
                    }),
                };
                Ok(AsyncResult::Done(stored))
            }
            Behavior::Pending(token) => Ok(AsyncResult::Pending {
                resume_token: token,
            }),
            Behavior::Fail(message) => Err(ClientError::Request(anyhow::anyhow!(message))),
            Behavior::Hang => std::future::pending().await,
        }
    }

    async fn delete_async(
        &self,
        _ctx: &OperationContext,
        spec: &NsgSpec,
        resume_token: Option<&str>,
    ) -> Result<AsyncResult<()>, ClientError> {
        self.record(Call::Delete {
            name: spec.name.clone(),
            resume_token: resume_token.map(str::to_string),
        });

        match Self::behavior(&self.delete_behavior, &spec.name) {
            Behavior::Complete => {
                let removed = self.groups.lock().unwrap().remove(&spec.name);
                match removed {
                    Some(_) => Ok(AsyncResult::Done(())),
                    None => Err(ClientError::NotFound),
                }
            }
            Behavior::Pending(token) => Ok(AsyncResult::Pending {
                resume_token: token,
            }),
            Behavior::Fail(message) => Err(ClientError::Request(anyhow::anyhow!(message))),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl SubResourceClient<NsgSpec> for FakeNetworkClient {
    async fn delete_sub_resource(
        &self,
        _ctx: &OperationContext,
        parent: &NsgSpec,
        name: &str,
    ) -> Result<(), ClientError> {
        self.record(Call::DeleteRule {
            group: parent.name.clone(),
            rule: name.to_string(),
        });
        let failing = self.failing_rule_deletes.lock().unwrap().contains(name);
        if failing {
            return Err(ClientError::Request(anyhow::anyhow!("rule delete failed")));
        }
        let mut groups = self.groups.lock().unwrap();
        if let Some(group) = groups.get_mut(&parent.name) {
            group
                .security_rules
                .retain(|rule| rule.name.as_deref() != Some(name));
        }
        Ok(())
    }
}
