//! # Runtime
//!
//! Caller-side retry scheduling for convergence passes.

pub mod backoff;
pub mod error_policy;

pub use backoff::FibonacciBackoff;
pub use error_policy::RequeuePolicy;
