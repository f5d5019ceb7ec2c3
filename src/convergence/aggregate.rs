//! # Error Precedence
//!
//! Folds the outcomes of every resource in a pass into the single error the
//! pass reports. Hard failures outrank in-progress operations, which outrank
//! success. Among equal severities the first one recorded is kept.

use crate::convergence::error::ConvergenceError;
use crate::convergence::operation::Severity;

/// Running fold over per-resource results
#[derive(Debug, Default)]
pub struct ErrorAggregator {
    winner: Option<ConvergenceError>,
}

impl ErrorAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of one resource. The stored error is only replaced
    /// by a strictly more severe one.
    pub fn record(&mut self, result: Result<(), ConvergenceError>) {
        let Err(err) = result else {
            return;
        };
        if Severity::of(Some(&err)) > self.severity() {
            self.winner = Some(err);
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::of(self.winner.as_ref())
    }

    #[must_use]
    pub fn current(&self) -> Option<&ConvergenceError> {
        self.winner.as_ref()
    }

    /// # Errors
    /// Returns the precedence-winning error, if any was recorded.
    pub fn into_result(self) -> Result<(), ConvergenceError> {
        match self.winner {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Fold a sequence of results into one.
///
/// # Errors
/// Returns the precedence-winning error, if any.
pub fn aggregate<I>(results: I) -> Result<(), ConvergenceError>
where
    I: IntoIterator<Item = Result<(), ConvergenceError>>,
{
    results
        .into_iter()
        .fold(ErrorAggregator::new(), |mut aggregator, result| {
            aggregator.record(result);
            aggregator
        })
        .into_result()
}
