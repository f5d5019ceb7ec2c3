//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Deadline for one convergence pass of a service (seconds)
    /// Executor calls still in flight when it expires are cancelled
    pub service_reconcile_timeout_secs: u64,
    /// Requeue interval while operations are in progress (seconds)
    pub in_progress_requeue_secs: u64,
    /// Requeue interval once everything has converged (seconds)
    pub steady_state_requeue_secs: u64,
    /// Fibonacci backoff starting value after a hard failure (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff maximum value (seconds)
    pub backoff_max_secs: u64,
    /// Field manager name used for server-side patches
    pub field_manager: String,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            service_reconcile_timeout_secs: DEFAULT_SERVICE_RECONCILE_TIMEOUT_SECS,
            in_progress_requeue_secs: DEFAULT_IN_PROGRESS_REQUEUE_SECS,
            steady_state_requeue_secs: DEFAULT_STEADY_STATE_REQUEUE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            log_enable_color: false,
            enable_metrics: true,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            service_reconcile_timeout_secs: env_var_or_default(
                "SERVICE_RECONCILE_TIMEOUT_SECS",
                DEFAULT_SERVICE_RECONCILE_TIMEOUT_SECS,
            ),
            in_progress_requeue_secs: env_var_or_default(
                "IN_PROGRESS_REQUEUE_SECS",
                DEFAULT_IN_PROGRESS_REQUEUE_SECS,
            ),
            steady_state_requeue_secs: env_var_or_default(
                "STEADY_STATE_REQUEUE_SECS",
                DEFAULT_STEADY_STATE_REQUEUE_SECS,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            field_manager: env_var_or_default_str("FIELD_MANAGER", DEFAULT_FIELD_MANAGER),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
            log_enable_color: env_var_or_default_bool("LOG_ENABLE_COLOR", false),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
        }
    }

    /// Get the convergence pass deadline
    #[must_use]
    pub fn service_reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.service_reconcile_timeout_secs)
    }

    /// Get the in-progress requeue duration
    #[must_use]
    pub fn in_progress_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.in_progress_requeue_secs)
    }

    /// Get the steady state requeue duration
    #[must_use]
    pub fn steady_state_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.steady_state_requeue_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| parse_bool(&v))
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
