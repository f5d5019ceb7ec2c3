//! # Scope
//!
//! Everything a convergence pass needs from the object that owns the
//! resources: the declared specs, the managed gate, the ledger annotations and
//! the status it reports back.

use crate::convergence::error::ConvergenceError;
use crate::convergence::gate::ManagedGate;
use crate::convergence::ledger::LedgerStore;
use crate::crd::{LongRunningOperationState, OperationKind};

/// Records in-flight operations and readiness conditions on the owning object
pub trait AsyncStatusUpdater: Send + Sync {
    /// Store `state`, replacing any state with the same resource, service and kind
    fn set_long_running_operation_state(&self, state: LongRunningOperationState);

    fn get_long_running_operation_state(
        &self,
        resource_name: &str,
        service_name: &str,
        kind: OperationKind,
    ) -> Option<LongRunningOperationState>;

    fn delete_long_running_operation_state(
        &self,
        resource_name: &str,
        service_name: &str,
        kind: OperationKind,
    );

    /// Set `condition` from the aggregated result of a reconcile pass
    fn update_put_status(&self, condition: &str, service_name: &str, err: Option<&ConvergenceError>);

    /// Set `condition` from the aggregated result of a delete pass
    fn update_delete_status(
        &self,
        condition: &str,
        service_name: &str,
        err: Option<&ConvergenceError>,
    );
}

/// Source of the desired specs, rebuilt on every call
pub trait SpecSource<S>: Send + Sync {
    fn specs(&self) -> Vec<S>;
}

/// Full set of capabilities the engine consumes from its scope
pub trait ConvergenceScope<S>:
    ManagedGate + LedgerStore + AsyncStatusUpdater + SpecSource<S>
{
}

impl<S, T> ConvergenceScope<S> for T where
    T: ManagedGate + LedgerStore + AsyncStatusUpdater + SpecSource<S> + ?Sized
{
}
