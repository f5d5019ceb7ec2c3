//! # Logging
//!
//! Tracing subscriber setup. `RUST_LOG` takes precedence over the configured
//! level when set.

use crate::config::ControllerConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &ControllerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.log_format.eq_ignore_ascii_case("json") {
        builder
            .json()
            .with_current_span(true)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
    } else {
        builder
            .with_ansi(config.log_enable_color)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
    }
}

/// Filter directive scoping the configured level to this crate
fn default_directive(level: &str) -> String {
    format!("security_group_controller={}", level.to_ascii_lowercase())
}
