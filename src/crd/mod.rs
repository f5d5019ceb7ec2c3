//! # Resource Types
//!
//! Serializable types for the declared network and for the status the
//! controller reports back.
//!
//! ## Module Structure
//!
//! - `network.rs` - Declared virtual network, subnets, security groups and rules
//! - `status.rs` - Conditions and in-flight long-running operations

mod network;
mod status;

pub use network::{
    ClusterNetwork, NetworkSpec, SecurityGroupProtocol, SecurityGroupSpec, SecurityRule,
    SecurityRuleAction, SecurityRuleDirection, SubnetSpec, VnetSpec,
};
pub use status::{
    Condition, ConditionSeverity, ConditionStatus, LongRunningOperationState, NetworkStatus,
    OperationKind,
};
