//! # Convergence
//!
//! Drives a collection of declared resource specs toward their desired remote
//! state through asynchronous long-running operations.
//!
//! ## Module Structure
//!
//! - `spec.rs` - Capability traits implemented by every reconciled resource
//! - `gate.rs` - Managed check short-circuiting unmanaged collections
//! - `ledger.rs` - Last-applied sub-resource record kept in an annotation
//! - `differ.rs` - Drift between declared and last-applied sub-resources
//! - `operation.rs` - Pass deadline and per-resource outcome classification
//! - `driver.rs` - Create/update and delete of one resource with operation resume
//! - `aggregate.rs` - Error precedence across resources
//! - `scope.rs` - Capabilities consumed from the owning object
//! - `engine.rs` - Reconcile and delete passes
//! - `error.rs` - Error types

pub mod aggregate;
pub mod differ;
pub mod driver;
pub mod engine;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod operation;
pub mod scope;
pub mod spec;

pub use aggregate::{aggregate, ErrorAggregator};
pub use differ::{union_missing, DriftPlan};
pub use driver::{AsyncReconciler, AsyncService, ResourceClient, SubResourceClient};
pub use engine::{Engine, ServiceDescriptor};
pub use error::{is_operation_not_done, ClientError, ConvergenceError, LedgerError, OperationNotDone};
pub use gate::{check_managed, ManagedGate};
pub use ledger::{decode_annotation, DriftLedger, LastAppliedState, LedgerStore};
pub use operation::{AsyncResult, OperationContext, OperationOutcome, Severity};
pub use scope::{AsyncStatusUpdater, ConvergenceScope, SpecSource};
pub use spec::{ParentResourceSpec, ResourceSpec, SubResourceSpec};
