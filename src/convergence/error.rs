//! # Errors
//!
//! Error types surfaced by a convergence pass and by its collaborators.

use crate::crd::{LongRunningOperationState, OperationKind};
use std::fmt;
use thiserror::Error;

/// Error returned by the remote resource executor
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote resource does not exist
    #[error("resource not found")]
    NotFound,
    /// The pass deadline expired before the call returned
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// Any other failure, including stale etag conflicts
    #[error(transparent)]
    Request(#[from] anyhow::Error),
}

impl ClientError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }
}

/// Error reading or writing the last-applied ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read annotation {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to write annotation {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to decode annotation {key} as a JSON object: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode sub-resource {name} of {parent}: {source}")]
    Encode {
        parent: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A long-running operation was submitted (or resumed) and has not finished yet.
///
/// This is not a failure: the next pass resumes the operation.
#[derive(Debug, Clone)]
pub struct OperationNotDone {
    pub state: LongRunningOperationState,
}

impl fmt::Display for OperationNotDone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation type {} on resource {}/{} is not done",
            self.state.kind, self.state.resource_group, self.state.resource_name
        )
    }
}

impl std::error::Error for OperationNotDone {}

impl OperationNotDone {
    #[must_use]
    pub fn new(state: LongRunningOperationState) -> Self {
        Self { state }
    }
}

/// Error produced by a convergence pass
#[derive(Debug, Error)]
pub enum ConvergenceError {
    /// Could not determine whether the collection is managed by this controller
    #[error("failed to check if {service} are managed: {source}")]
    ManagedCheck {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    OperationNotDone(#[from] OperationNotDone),
    #[error("failed to get existing resource {group}/{name} (service: {service}): {source}")]
    Get {
        group: String,
        name: String,
        service: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to get desired parameters for resource {group}/{name} (service: {service}): {source}")]
    Parameters {
        group: String,
        name: String,
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to {} resource {group}/{name} (service: {service}): {source}", operation_verb(.kind))]
    Resource {
        kind: OperationKind,
        group: String,
        name: String,
        service: String,
        #[source]
        source: ClientError,
    },
}

impl ConvergenceError {
    /// True when the error only signals that an operation is still in flight
    #[must_use]
    pub fn is_operation_not_done(&self) -> bool {
        matches!(self, ConvergenceError::OperationNotDone(_))
    }
}

/// Predicate form of [`ConvergenceError::is_operation_not_done`] for optional results
#[must_use]
pub fn is_operation_not_done(err: Option<&ConvergenceError>) -> bool {
    err.is_some_and(ConvergenceError::is_operation_not_done)
}

fn operation_verb(kind: &OperationKind) -> &'static str {
    match kind {
        OperationKind::Put => "create or update",
        OperationKind::Delete => "delete",
    }
}
