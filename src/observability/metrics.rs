//! # Metrics
//!
//! Prometheus metrics for monitoring convergence passes.
//!
//! ## Metrics Exposed
//!
//! - `security_group_controller_passes_total` - Total number of passes by service, operation and result
//! - `security_group_controller_pass_duration_seconds` - Duration of passes by service and operation
//! - `security_group_controller_resource_outcomes_total` - Outcome of each resource operation
//! - `security_group_controller_drift_deletions_total` - Sub-resources deleted because they are no longer declared
//! - `security_group_controller_drift_deletion_errors_total` - Failed sub-resource deletions
//! - `security_group_controller_skipped_passes_total` - Passes skipped because the collection is unmanaged

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static PASSES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "security_group_controller_passes_total",
            "Total number of convergence passes",
        ),
        &["service", "operation", "result"],
    )
    .expect("Failed to create PASSES_TOTAL metric - this should never happen")
});

static PASS_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "security_group_controller_pass_duration_seconds",
            "Duration of convergence passes in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .expect("Failed to create PASS_DURATION metric - this should never happen")
});

static RESOURCE_OUTCOMES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "security_group_controller_resource_outcomes_total",
            "Total number of resource operations by outcome",
        ),
        &["service", "operation", "outcome"],
    )
    .expect("Failed to create RESOURCE_OUTCOMES_TOTAL metric - this should never happen")
});

static DRIFT_DELETIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "security_group_controller_drift_deletions_total",
            "Total number of sub-resources deleted after no longer being declared",
        ),
        &["service"],
    )
    .expect("Failed to create DRIFT_DELETIONS_TOTAL metric - this should never happen")
});

static DRIFT_DELETION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "security_group_controller_drift_deletion_errors_total",
            "Total number of failed sub-resource deletions",
        ),
        &["service"],
    )
    .expect("Failed to create DRIFT_DELETION_ERRORS_TOTAL metric - this should never happen")
});

static SKIPPED_PASSES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "security_group_controller_skipped_passes_total",
            "Total number of passes skipped because the collection is not managed",
        ),
        &["service", "operation"],
    )
    .expect("Failed to create SKIPPED_PASSES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(PASSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PASS_DURATION.clone()))?;
    REGISTRY.register(Box::new(RESOURCE_OUTCOMES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DRIFT_DELETIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DRIFT_DELETION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SKIPPED_PASSES_TOTAL.clone()))?;

    Ok(())
}

/// Gather everything registered, for exposition by the caller
#[must_use]
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn record_pass(service: &str, operation: &str, result: &str, duration: f64) {
    PASSES_TOTAL
        .with_label_values(&[service, operation, result])
        .inc();
    PASS_DURATION
        .with_label_values(&[service, operation])
        .observe(duration);
}

pub fn record_resource_outcome(service: &str, operation: &str, outcome: &str) {
    RESOURCE_OUTCOMES_TOTAL
        .with_label_values(&[service, operation, outcome])
        .inc();
}

pub fn increment_drift_deletions(service: &str) {
    DRIFT_DELETIONS_TOTAL.with_label_values(&[service]).inc();
}

pub fn increment_drift_deletion_errors(service: &str) {
    DRIFT_DELETION_ERRORS_TOTAL.with_label_values(&[service]).inc();
}

pub fn increment_skipped_passes(service: &str, operation: &str) {
    SKIPPED_PASSES_TOTAL
        .with_label_values(&[service, operation])
        .inc();
}
