//! # Operations
//!
//! Per-pass context handed to the executor and the classification of each
//! remote operation.

use crate::convergence::error::{ClientError, ConvergenceError, OperationNotDone};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Context shared by every executor call of one convergence pass
///
/// Carries the pass deadline. Executors are expected to observe it and return
/// promptly once it has expired; the engine additionally drops any call still
/// running at the deadline.
#[derive(Debug, Clone, Copy)]
pub struct OperationContext {
    deadline: Instant,
}

impl OperationContext {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Race an executor call against the pass deadline. An expired call is
    /// dropped, which cancels it.
    pub async fn run<T, F>(&self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match tokio::time::timeout_at(self.deadline, call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ClientError::DeadlineExceeded),
        }
    }
}

/// Result of submitting (or resuming) an asynchronous remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncResult<T> {
    /// The operation completed within the call
    Done(T),
    /// The operation was accepted and continues remotely
    Pending { resume_token: String },
}

/// Classification of one resource's operation within a pass
#[derive(Debug)]
pub enum OperationOutcome<T> {
    Done(T),
    InProgress(OperationNotDone),
    Failed(ConvergenceError),
}

impl<T> OperationOutcome<T> {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            OperationOutcome::Done(_) => Severity::Done,
            OperationOutcome::InProgress(_) => Severity::InProgress,
            OperationOutcome::Failed(_) => Severity::Failed,
        }
    }

    /// Collapse into a result, in-progress becoming a distinguishable error
    ///
    /// # Errors
    /// Returns the in-progress marker or the failure.
    pub fn into_result(self) -> Result<T, ConvergenceError> {
        match self {
            OperationOutcome::Done(value) => Ok(value),
            OperationOutcome::InProgress(not_done) => Err(ConvergenceError::OperationNotDone(not_done)),
            OperationOutcome::Failed(err) => Err(err),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.severity().as_str()
    }
}

/// Precedence of outcomes when several resources are reported as one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Done,
    InProgress,
    Failed,
}

impl Severity {
    #[must_use]
    pub fn of(err: Option<&ConvergenceError>) -> Self {
        match err {
            None => Severity::Done,
            Some(e) if e.is_operation_not_done() => Severity::InProgress,
            Some(_) => Severity::Failed,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Done => "done",
            Severity::InProgress => "in_progress",
            Severity::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Failed > Severity::InProgress);
        assert!(Severity::InProgress > Severity::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cancels_call_at_deadline() {
        let ctx = OperationContext::with_timeout(Duration::from_secs(5));
        let result: Result<(), ClientError> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ClientError::DeadlineExceeded)));
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_call_result_before_deadline() {
        let ctx = OperationContext::with_timeout(Duration::from_secs(5));
        let result = ctx.run(async { Ok::<_, ClientError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert!(!ctx.is_expired());
    }
}
