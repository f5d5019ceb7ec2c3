//! # Requeue Policy
//!
//! Turns the result of a pass into the controller runtime's next action.
//!
//! - Converged: requeue at the steady-state interval and reset backoff
//! - In progress: requeue quickly so the operation is resumed
//! - Failed: requeue with per-object Fibonacci backoff

use crate::config::ControllerConfig;
use crate::convergence::{ConvergenceError, Severity};
use crate::runtime::backoff::FibonacciBackoff;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_seconds, max_seconds),
            error_count: 0,
        }
    }
}

/// Requeue decisions with backoff state per object key (`namespace/name`)
#[derive(Debug)]
pub struct RequeuePolicy {
    steady_state: Duration,
    in_progress: Duration,
    backoff_min_secs: u64,
    backoff_max_secs: u64,
    states: Mutex<HashMap<String, BackoffState>>,
}

impl RequeuePolicy {
    #[must_use]
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            steady_state: config.steady_state_requeue_duration(),
            in_progress: config.in_progress_requeue_duration(),
            backoff_min_secs: config.backoff_min_secs,
            backoff_max_secs: config.backoff_max_secs,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Next action for `key` after a pass returned `result`
    pub fn requeue_action(&self, key: &str, result: Result<(), &ConvergenceError>) -> Action {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);

        match Severity::of(result.err()) {
            Severity::Done => {
                if let Some(state) = states.remove(key) {
                    debug!(
                        "Resetting backoff for {} after {} failed passes",
                        key, state.error_count
                    );
                }
                Action::requeue(self.steady_state)
            }
            Severity::InProgress => Action::requeue(self.in_progress),
            Severity::Failed => {
                let state = states
                    .entry(key.to_string())
                    .or_insert_with(|| BackoffState::new(self.backoff_min_secs, self.backoff_max_secs));
                state.error_count += 1;
                let delay = state.backoff.next_backoff();
                warn!(
                    "Pass for {} failed (attempt {}), retrying in {}s",
                    key,
                    state.error_count,
                    delay.as_secs()
                );
                Action::requeue(delay)
            }
        }
    }

    /// Number of consecutive failed passes for `key`
    #[must_use]
    pub fn error_count(&self, key: &str) -> u32 {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, |state| state.error_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convergence::{ClientError, OperationNotDone};
    use crate::crd::{LongRunningOperationState, OperationKind};
    use chrono::Utc;

    fn failed() -> ConvergenceError {
        ConvergenceError::Resource {
            kind: OperationKind::Put,
            group: "my-rg".to_string(),
            name: "node-nsg".to_string(),
            service: "securitygroups".to_string(),
            source: ClientError::Request(anyhow::anyhow!("conflict")),
        }
    }

    fn in_progress() -> ConvergenceError {
        ConvergenceError::from(OperationNotDone::new(LongRunningOperationState {
            resource_name: "node-nsg".to_string(),
            resource_group: "my-rg".to_string(),
            service_name: "securitygroups".to_string(),
            kind: OperationKind::Put,
            resume_token: "token".to_string(),
            started_at: Utc::now(),
        }))
    }

    #[test]
    fn test_failures_back_off_and_success_resets() {
        let policy = RequeuePolicy::new(&ControllerConfig::default());
        let err = failed();

        assert_eq!(policy.requeue_action("ns/a", Err(&err)), Action::requeue(Duration::from_secs(30)));
        assert_eq!(policy.requeue_action("ns/a", Err(&err)), Action::requeue(Duration::from_secs(30)));
        assert_eq!(policy.requeue_action("ns/a", Err(&err)), Action::requeue(Duration::from_secs(60)));
        assert_eq!(policy.error_count("ns/a"), 3);

        // independent per key
        assert_eq!(policy.requeue_action("ns/b", Err(&err)), Action::requeue(Duration::from_secs(30)));

        assert_eq!(policy.requeue_action("ns/a", Ok(())), Action::requeue(Duration::from_secs(600)));
        assert_eq!(policy.error_count("ns/a"), 0);
        assert_eq!(policy.requeue_action("ns/a", Err(&err)), Action::requeue(Duration::from_secs(30)));
    }

    #[test]
    fn test_in_progress_requeues_quickly_without_backoff() {
        let policy = RequeuePolicy::new(&ControllerConfig::default());
        let err = in_progress();

        assert_eq!(policy.requeue_action("ns/a", Err(&err)), Action::requeue(Duration::from_secs(15)));
        assert_eq!(policy.error_count("ns/a"), 0);
    }
}
