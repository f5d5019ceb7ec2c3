//! # Convergence Engine
//!
//! Runs one reconcile or delete pass over every spec of a service.
//!
//! A pass is gated on the collection being managed, processes specs strictly
//! in declared order, and attempts every spec exactly once regardless of
//! earlier failures. Per-spec outcomes are folded into the one error the pass
//! returns and reports on the scope's condition.
//!
//! The ledger read-then-write is not atomic. At most one pass may be active
//! per scope at a time; the caller's controller runtime guarantees this.

use crate::convergence::aggregate::ErrorAggregator;
use crate::convergence::differ::DriftPlan;
use crate::convergence::driver::{AsyncReconciler, SubResourceClient};
use crate::convergence::error::ConvergenceError;
use crate::convergence::gate::check_managed;
use crate::convergence::ledger::DriftLedger;
use crate::convergence::operation::{OperationContext, Severity};
use crate::convergence::scope::ConvergenceScope;
use crate::convergence::spec::ParentResourceSpec;
use crate::crd::OperationKind;
use crate::observability::metrics;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

/// Static identity of a reconciled service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service name used in errors, metrics and long-running operation states
    pub name: &'static str,
    /// Condition type reported on the owning object
    pub condition: &'static str,
    /// Annotation holding the last-applied sub-resources, when the service tracks drift
    pub ledger_annotation: Option<&'static str>,
}

/// Convergence engine for one service
pub struct Engine<S, Sc: ?Sized, R, D> {
    descriptor: ServiceDescriptor,
    scope: Arc<Sc>,
    reconciler: R,
    sub_resources: D,
    timeout: Duration,
    _spec: PhantomData<fn() -> S>,
}

impl<S, Sc: ?Sized, R, D> fmt::Debug for Engine<S, Sc, R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("descriptor", &self.descriptor)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S, Sc, R, D> Engine<S, Sc, R, D>
where
    S: ParentResourceSpec,
    Sc: ConvergenceScope<S> + ?Sized,
    R: AsyncReconciler<S>,
    D: SubResourceClient<S>,
{
    pub fn new(
        descriptor: ServiceDescriptor,
        scope: Arc<Sc>,
        reconciler: R,
        sub_resources: D,
        timeout: Duration,
    ) -> Self {
        Self {
            descriptor,
            scope,
            reconciler,
            sub_resources,
            timeout,
            _spec: PhantomData,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Converge every declared spec toward its desired state.
    ///
    /// # Errors
    /// Returns the precedence-winning per-spec error, or a gate or ledger
    /// error that aborted the pass.
    pub async fn reconcile(&self) -> Result<(), ConvergenceError> {
        let span = info_span!("convergence.reconcile", service = self.descriptor.name);
        let started = Instant::now();
        let result = self.run_reconcile().instrument(span).await;
        self.record_pass(OperationKind::Put, started, result.as_ref().err());
        result
    }

    /// Delete every declared spec.
    ///
    /// # Errors
    /// Returns the precedence-winning per-spec error, or a gate error.
    pub async fn delete(&self) -> Result<(), ConvergenceError> {
        let span = info_span!("convergence.delete", service = self.descriptor.name);
        let started = Instant::now();
        let result = self.run_delete().instrument(span).await;
        self.record_pass(OperationKind::Delete, started, result.as_ref().err());
        result
    }

    async fn run_reconcile(&self) -> Result<(), ConvergenceError> {
        let service = self.descriptor.name;
        let ctx = OperationContext::with_timeout(self.timeout);

        if !check_managed(&*self.scope, service).await? {
            debug!("Skipping {} reconcile, lifecycle is not managed", service);
            metrics::increment_skipped_passes(service, OperationKind::Put.as_str());
            return Ok(());
        }

        let specs = self.scope.specs();
        if specs.is_empty() {
            return Ok(());
        }

        let mut aggregator = ErrorAggregator::new();
        for spec in &specs {
            if let Some(key) = self.descriptor.ledger_annotation {
                self.converge_sub_resources(&ctx, spec, key).await?;
            }

            let outcome = self
                .reconciler
                .create_or_update_resource(&ctx, spec, service)
                .instrument(info_span!("resource", name = spec.resource_name()))
                .await;
            metrics::record_resource_outcome(service, OperationKind::Put.as_str(), outcome.label());
            aggregator.record(outcome.into_result().map(|_| ()));
        }

        self.scope
            .update_put_status(self.descriptor.condition, service, aggregator.current());
        aggregator.into_result()
    }

    async fn run_delete(&self) -> Result<(), ConvergenceError> {
        let service = self.descriptor.name;
        let ctx = OperationContext::with_timeout(self.timeout);

        if !check_managed(&*self.scope, service).await? {
            debug!("Skipping {} delete, lifecycle is not managed", service);
            metrics::increment_skipped_passes(service, OperationKind::Delete.as_str());
            return Ok(());
        }

        let specs = self.scope.specs();
        if specs.is_empty() {
            return Ok(());
        }

        let mut aggregator = ErrorAggregator::new();
        for spec in &specs {
            let outcome = self
                .reconciler
                .delete_resource(&ctx, spec, service)
                .instrument(info_span!("resource", name = spec.resource_name()))
                .await;
            metrics::record_resource_outcome(
                service,
                OperationKind::Delete.as_str(),
                outcome.label(),
            );
            aggregator.record(outcome.into_result());
        }

        self.scope
            .update_delete_status(self.descriptor.condition, service, aggregator.current());
        aggregator.into_result()
    }

    /// Delete sub-resources that are no longer declared and record the declared set as
    /// last applied. The ledger is written back even when nothing changed.
    async fn converge_sub_resources(
        &self,
        ctx: &OperationContext,
        spec: &S,
        key: &str,
    ) -> Result<(), ConvergenceError> {
        let service = self.descriptor.name;
        let parent = spec.resource_name();
        let ledger = DriftLedger::new(&*self.scope, key);

        let mut last_applied = ledger.load().await?;
        let plan = DriftPlan::compute(spec, &last_applied)?;

        for name in &plan.removed {
            match ctx
                .run(self.sub_resources.delete_sub_resource(ctx, spec, name))
                .await
            {
                Ok(()) => {
                    info!(
                        "Deleted {} sub-resource {} of {}/{}, it is no longer declared",
                        service,
                        name,
                        spec.resource_group_name(),
                        parent
                    );
                    metrics::increment_drift_deletions(service);
                }
                Err(e) => {
                    warn!(
                        "Failed to delete {} sub-resource {} of {}/{}: {}",
                        service,
                        name,
                        spec.resource_group_name(),
                        parent,
                        e
                    );
                    metrics::increment_drift_deletion_errors(service);
                }
            }
        }

        plan.apply(parent, &mut last_applied);
        ledger.store(last_applied).await?;
        Ok(())
    }

    fn record_pass(&self, kind: OperationKind, started: Instant, err: Option<&ConvergenceError>) {
        let severity = Severity::of(err);
        metrics::record_pass(
            self.descriptor.name,
            kind.as_str(),
            severity.as_str(),
            started.elapsed().as_secs_f64(),
        );
        if severity == Severity::Failed {
            if let Some(e) = err {
                warn!("{} {} pass failed: {}", self.descriptor.name, kind, e);
            }
        }
    }
}
