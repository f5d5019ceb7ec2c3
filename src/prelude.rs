//! Commonly used types, for glob import by callers wiring a service.

pub use crate::config::ControllerConfig;
pub use crate::convergence::{
    is_operation_not_done, AsyncResult, AsyncStatusUpdater, ClientError, ConvergenceError,
    LedgerStore, ManagedGate, OperationContext, ResourceClient, ResourceSpec, SubResourceClient,
};
pub use crate::crd::ClusterNetwork;
pub use crate::runtime::RequeuePolicy;
pub use crate::scope::{ClusterScope, ObjectPatcher, ObjectState};
pub use crate::services::securitygroups::{NsgSpec, SecurityGroup, Service as SecurityGroupService};
