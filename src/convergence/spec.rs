//! # Resource Specs
//!
//! Capability traits every reconciled resource type implements. The
//! convergence engine only ever talks to resources through these traits.

use serde::Serialize;
use std::fmt;

/// A desired remote resource
pub trait ResourceSpec: Send + Sync + fmt::Debug {
    /// Provider-side representation of the resource
    type Resource: Clone + Send + Sync + fmt::Debug;

    fn resource_name(&self) -> &str;

    fn resource_group_name(&self) -> &str;

    /// Name of the parent resource for nested resources, empty otherwise
    fn owner_resource_name(&self) -> &str {
        ""
    }

    /// Resolve the parameters to submit given the existing remote state
    /// (`None` when the resource does not exist yet).
    ///
    /// Returning `Ok(None)` means the resource is already converged and no
    /// write must be issued. Implementations must be pure given `existing`.
    ///
    /// # Errors
    /// Returns an error if `existing` cannot be interpreted.
    fn parameters(&self, existing: Option<&Self::Resource>) -> anyhow::Result<Option<Self::Resource>>;
}

/// A resource that owns a list of named sub-resources (for example a security
/// group and its security rules).
pub trait ParentResourceSpec: ResourceSpec {
    /// Payload of one sub-resource, persisted verbatim in the last-applied ledger
    type SubResource: Serialize + Send + Sync + fmt::Debug;

    fn sub_resources(&self) -> &[SubResourceSpec<Self::SubResource>];
}

/// One declared sub-resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubResourceSpec<P> {
    /// Unique within the parent
    pub name: String,
    pub payload: P,
    /// Lifecycle is owned by this controller regardless of ownership tags, so
    /// the sub-resource is tracked in the ledger and deleted once undeclared
    pub managed_always: bool,
}

impl<P> SubResourceSpec<P> {
    #[must_use]
    pub fn managed(name: impl Into<String>, payload: P) -> Self {
        Self {
            name: name.into(),
            payload,
            managed_always: true,
        }
    }

    #[must_use]
    pub fn unmanaged(name: impl Into<String>, payload: P) -> Self {
        Self {
            name: name.into(),
            payload,
            managed_always: false,
        }
    }
}
