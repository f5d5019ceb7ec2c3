//! # Async Convergence Driver
//!
//! Drives one resource spec through its remote create/update or delete and
//! classifies the result. Operations the provider accepts but does not finish
//! within the call are recorded on the scope and resumed on the next pass with
//! their resume token.

use crate::convergence::error::{ClientError, ConvergenceError, OperationNotDone};
use crate::convergence::operation::{AsyncResult, OperationContext, OperationOutcome};
use crate::convergence::scope::AsyncStatusUpdater;
use crate::convergence::spec::ResourceSpec;
use crate::crd::{LongRunningOperationState, OperationKind};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Remote executor for one resource type, implemented by the caller
///
/// Implementations must return [`ClientError::NotFound`] for missing
/// resources so it can be told apart from other failures.
#[async_trait]
pub trait ResourceClient<S: ResourceSpec>: Send + Sync {
    async fn get(&self, ctx: &OperationContext, spec: &S) -> Result<S::Resource, ClientError>;

    /// Submit a create or update, or resume one when `resume_token` is set
    /// (`parameters` is then `None`).
    async fn create_or_update_async(
        &self,
        ctx: &OperationContext,
        spec: &S,
        resume_token: Option<&str>,
        parameters: Option<S::Resource>,
    ) -> Result<AsyncResult<S::Resource>, ClientError>;

    /// Submit a delete, or resume one when `resume_token` is set
    async fn delete_async(
        &self,
        ctx: &OperationContext,
        spec: &S,
        resume_token: Option<&str>,
    ) -> Result<AsyncResult<()>, ClientError>;
}

/// Deletes individual sub-resources of a parent
#[async_trait]
pub trait SubResourceClient<S: ResourceSpec>: Send + Sync {
    async fn delete_sub_resource(
        &self,
        ctx: &OperationContext,
        parent: &S,
        name: &str,
    ) -> Result<(), ClientError>;
}

#[async_trait]
impl<S, T> ResourceClient<S> for Arc<T>
where
    S: ResourceSpec,
    T: ResourceClient<S> + ?Sized,
{
    async fn get(&self, ctx: &OperationContext, spec: &S) -> Result<S::Resource, ClientError> {
        (**self).get(ctx, spec).await
    }

    async fn create_or_update_async(
        &self,
        ctx: &OperationContext,
        spec: &S,
        resume_token: Option<&str>,
        parameters: Option<S::Resource>,
    ) -> Result<AsyncResult<S::Resource>, ClientError> {
        (**self)
            .create_or_update_async(ctx, spec, resume_token, parameters)
            .await
    }

    async fn delete_async(
        &self,
        ctx: &OperationContext,
        spec: &S,
        resume_token: Option<&str>,
    ) -> Result<AsyncResult<()>, ClientError> {
        (**self).delete_async(ctx, spec, resume_token).await
    }
}

#[async_trait]
impl<S, T> SubResourceClient<S> for Arc<T>
where
    S: ResourceSpec,
    T: SubResourceClient<S> + ?Sized,
{
    async fn delete_sub_resource(
        &self,
        ctx: &OperationContext,
        parent: &S,
        name: &str,
    ) -> Result<(), ClientError> {
        (**self).delete_sub_resource(ctx, parent, name).await
    }
}

/// Create/update and delete of one resource with long-running operation tracking
#[async_trait]
pub trait AsyncReconciler<S: ResourceSpec>: Send + Sync {
    /// `Done(None)` means the resource did not exist and needed no write.
    async fn create_or_update_resource(
        &self,
        ctx: &OperationContext,
        spec: &S,
        service_name: &str,
    ) -> OperationOutcome<Option<S::Resource>>;

    async fn delete_resource(
        &self,
        ctx: &OperationContext,
        spec: &S,
        service_name: &str,
    ) -> OperationOutcome<()>;
}

/// [`AsyncReconciler`] backed by a status updater and a remote executor
pub struct AsyncService<U: ?Sized, C> {
    status: Arc<U>,
    client: C,
}

impl<U: ?Sized, C> fmt::Debug for AsyncService<U, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncService").finish_non_exhaustive()
    }
}

impl<U: ?Sized, C> AsyncService<U, C> {
    pub fn new(status: Arc<U>, client: C) -> Self {
        Self { status, client }
    }
}

impl<U, C> AsyncService<U, C>
where
    U: AsyncStatusUpdater + ?Sized,
{
    /// Look up the resume token of an in-flight operation
    fn resume(
        &self,
        resource_name: &str,
        service_name: &str,
        kind: OperationKind,
    ) -> Option<LongRunningOperationState> {
        let state = self
            .status
            .get_long_running_operation_state(resource_name, service_name, kind)?;
        debug!(
            "Resuming {} operation on {}/{} (service: {}), started at {}",
            kind, state.resource_group, resource_name, service_name, state.started_at
        );
        Some(state)
    }

    /// Record a pending operation and build the in-progress outcome for it
    fn record_pending<T>(
        &self,
        previous: Option<LongRunningOperationState>,
        resource_name: &str,
        resource_group: &str,
        service_name: &str,
        kind: OperationKind,
        resume_token: String,
    ) -> OperationOutcome<T> {
        let state = LongRunningOperationState {
            resource_name: resource_name.to_string(),
            resource_group: resource_group.to_string(),
            service_name: service_name.to_string(),
            kind,
            resume_token,
            started_at: previous.map_or_else(Utc::now, |p| p.started_at),
        };
        self.status.set_long_running_operation_state(state.clone());
        debug!(
            "{} operation on {}/{} (service: {}) is still in progress",
            kind, state.resource_group, state.resource_name, service_name
        );
        OperationOutcome::InProgress(OperationNotDone::new(state))
    }
}

#[async_trait]
impl<S, U, C> AsyncReconciler<S> for AsyncService<U, C>
where
    S: ResourceSpec,
    U: AsyncStatusUpdater + ?Sized,
    C: ResourceClient<S>,
{
    async fn create_or_update_resource(
        &self,
        ctx: &OperationContext,
        spec: &S,
        service_name: &str,
    ) -> OperationOutcome<Option<S::Resource>> {
        let name = spec.resource_name();
        let group = spec.resource_group_name();
        let kind = OperationKind::Put;

        let previous = self.resume(name, service_name, kind);
        let resume_token = previous.as_ref().map(|p| p.resume_token.clone());

        // A resumed operation already carries its parameters remotely.
        let mut parameters = None;
        if resume_token.is_none() {
            let existing = match ctx.run(self.client.get(ctx, spec)).await {
                Ok(resource) => Some(resource),
                Err(ClientError::NotFound) => None,
                Err(source) => {
                    return OperationOutcome::Failed(ConvergenceError::Get {
                        group: group.to_string(),
                        name: name.to_string(),
                        service: service_name.to_string(),
                        source,
                    });
                }
            };

            match spec.parameters(existing.as_ref()) {
                Ok(Some(desired)) => parameters = Some(desired),
                Ok(None) => {
                    debug!(
                        "Resource {}/{} (service: {}) is up to date, skipping update",
                        group, name, service_name
                    );
                    return OperationOutcome::Done(existing);
                }
                Err(source) => {
                    return OperationOutcome::Failed(ConvergenceError::Parameters {
                        group: group.to_string(),
                        name: name.to_string(),
                        service: service_name.to_string(),
                        source,
                    });
                }
            }
        }

        let result = ctx
            .run(self.client.create_or_update_async(
                ctx,
                spec,
                resume_token.as_deref(),
                parameters,
            ))
            .await;

        match result {
            Ok(AsyncResult::Pending { resume_token }) => {
                self.record_pending(previous, name, group, service_name, kind, resume_token)
            }
            Ok(AsyncResult::Done(resource)) => {
                self.status
                    .delete_long_running_operation_state(name, service_name, kind);
                debug!(
                    "Successfully created or updated resource {}/{} (service: {})",
                    group, name, service_name
                );
                OperationOutcome::Done(Some(resource))
            }
            Err(source) => {
                self.status
                    .delete_long_running_operation_state(name, service_name, kind);
                warn!(
                    "Failed to create or update resource {}/{} (service: {}): {}",
                    group, name, service_name, source
                );
                OperationOutcome::Failed(ConvergenceError::Resource {
                    kind,
                    group: group.to_string(),
                    name: name.to_string(),
                    service: service_name.to_string(),
                    source,
                })
            }
        }
    }

    async fn delete_resource(
        &self,
        ctx: &OperationContext,
        spec: &S,
        service_name: &str,
    ) -> OperationOutcome<()> {
        let name = spec.resource_name();
        let group = spec.resource_group_name();
        let kind = OperationKind::Delete;

        let previous = self.resume(name, service_name, kind);
        let resume_token = previous.as_ref().map(|p| p.resume_token.clone());

        let result = ctx
            .run(self.client.delete_async(ctx, spec, resume_token.as_deref()))
            .await;

        match result {
            Ok(AsyncResult::Pending { resume_token }) => {
                self.record_pending(previous, name, group, service_name, kind, resume_token)
            }
            Ok(AsyncResult::Done(())) | Err(ClientError::NotFound) => {
                self.status
                    .delete_long_running_operation_state(name, service_name, kind);
                debug!(
                    "Successfully deleted resource {}/{} (service: {})",
                    group, name, service_name
                );
                OperationOutcome::Done(())
            }
            Err(source) => {
                self.status
                    .delete_long_running_operation_state(name, service_name, kind);
                warn!(
                    "Failed to delete resource {}/{} (service: {}): {}",
                    group, name, service_name, source
                );
                OperationOutcome::Failed(ConvergenceError::Resource {
                    kind,
                    group: group.to_string(),
                    name: name.to_string(),
                    service: service_name.to_string(),
                    source,
                })
            }
        }
    }
}
