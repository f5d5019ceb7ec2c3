//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - `logging`: tracing subscriber setup

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::register_metrics;

use crate::config::ControllerConfig;

/// Install the tracing subscriber and, when enabled, register the metrics
///
/// # Errors
/// Returns an error if the subscriber is already set or a metric is already registered.
pub fn init(config: &ControllerConfig) -> anyhow::Result<()> {
    init_logging(config)?;
    if config.enable_metrics {
        register_metrics()?;
    }
    Ok(())
}
