//! Security Group Controller Library
//!
//! Convergence engine driving a cluster's network security groups, and the
//! security rules declared on them, toward their declared state.
//!
//! ## Module Structure
//!
//! - `convergence` - Generic engine: gate, drift ledger, async driver, error precedence
//! - `services` - Resource-specific services built on the engine
//! - `scope` - Owning-object state (annotations, conditions, in-flight operations)
//! - `crd` - Declared network and status types
//! - `runtime` - Requeue policy for the caller's controller loop
//! - `observability` - Logging and metrics
//! - `config` / `constants` - Configuration and defaults

pub mod config;
pub mod constants;
pub mod convergence;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod services;
