//! # Scope
//!
//! Owning-object side of a convergence pass.
//!
//! ## Module Structure
//!
//! - `cluster.rs` - In-memory cluster scope implementing every capability the engine consumes
//! - `conditions.rs` - Readiness conditions derived from pass results
//! - `patch.rs` - Loading and persisting the scope state on a Kubernetes object

pub mod cluster;
pub mod conditions;
pub mod patch;

pub use cluster::{ClusterScope, ObjectState};
pub use patch::ObjectPatcher;
