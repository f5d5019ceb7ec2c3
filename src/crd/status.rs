//! # Status Types
//!
//! Status carried by the object that owns the security groups: readiness
//! conditions per service and the long-running operations still in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the object owning the security groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub long_running_operation_states: Vec<LongRunningOperationState>,
}

/// Condition reported for one service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<ConditionSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_transition_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
}

/// Kind of remote operation a long-running operation was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum OperationKind {
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "DELETE")]
    Delete,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Put => "PUT",
            OperationKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous remote operation that has been submitted but not finished.
///
/// Persisted in status so the next pass resumes polling with `resume_token`
/// instead of submitting the operation again.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongRunningOperationState {
    pub resource_name: String,
    pub resource_group: String,
    pub service_name: String,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Opaque token handed back to the executor to resume polling
    pub resume_token: String,
    pub started_at: DateTime<Utc>,
}

impl LongRunningOperationState {
    #[must_use]
    pub fn matches(&self, resource_name: &str, service_name: &str, kind: OperationKind) -> bool {
        self.resource_name == resource_name && self.service_name == service_name && self.kind == kind
    }
}
