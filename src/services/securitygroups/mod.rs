//! # Security Groups
//!
//! Reconciles the network security groups of a cluster and the security
//! rules declared on them.
//!
//! Rules declared on a security group are always managed: they are recorded in
//! the last-applied annotation, and a rule no longer declared is deleted
//! from the security group on the next pass. Rules added to a security group
//! out of band are left alone.

mod converters;
mod model;
mod spec;

pub use converters::{build_tags, security_rule_to_sdk};
pub use model::{NetworkSecurityRule, RuleAccess, RuleDirection, RuleProtocol, SecurityGroup};
pub use spec::{nsg_specs, rule_exists, NsgSpec};

use crate::constants::SECURITY_RULE_LAST_APPLIED_ANNOTATION;
use crate::convergence::{
    check_managed, AsyncService, ConvergenceError, ConvergenceScope, Engine, ResourceClient,
    ServiceDescriptor, SubResourceClient,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const SERVICE_NAME: &str = "securitygroups";

/// Condition type reporting security group readiness
pub const SECURITY_GROUPS_READY_CONDITION: &str = "SecurityGroupsReady";

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: SERVICE_NAME,
    condition: SECURITY_GROUPS_READY_CONDITION,
    ledger_annotation: Some(SECURITY_RULE_LAST_APPLIED_ANNOTATION),
};

/// Security group service
///
/// `client` performs the remote calls for both security groups and their
/// individual security rules.
pub struct Service<Sc: ?Sized, C> {
    scope: Arc<Sc>,
    engine: Engine<NsgSpec, Sc, AsyncService<Sc, Arc<C>>, Arc<C>>,
}

impl<Sc: ?Sized, C> fmt::Debug for Service<Sc, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &SERVICE_NAME)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<Sc, C> Service<Sc, C>
where
    Sc: ConvergenceScope<NsgSpec> + ?Sized,
    C: ResourceClient<NsgSpec> + SubResourceClient<NsgSpec>,
{
    pub fn new(scope: Arc<Sc>, client: C, timeout: Duration) -> Self {
        let client = Arc::new(client);
        let reconciler = AsyncService::new(Arc::clone(&scope), Arc::clone(&client));
        let engine = Engine::new(DESCRIPTOR, Arc::clone(&scope), reconciler, client, timeout);
        Self { scope, engine }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    /// Idempotently create or update the security groups and prune security
    /// rules that are no longer declared.
    ///
    /// # Errors
    /// Returns the most pressing error among the security groups.
    pub async fn reconcile(&self) -> Result<(), ConvergenceError> {
        self.engine.reconcile().await
    }

    /// Delete the security groups.
    ///
    /// # Errors
    /// Returns the most pressing error among the security groups.
    pub async fn delete(&self) -> Result<(), ConvergenceError> {
        self.engine.delete().await
    }

    /// # Errors
    /// Returns an error if the managed state cannot be determined.
    pub async fn is_managed(&self) -> Result<bool, ConvergenceError> {
        check_managed(&*self.scope, SERVICE_NAME).await
    }
}
