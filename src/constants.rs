//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Annotation holding the last applied security rules of every security group,
/// as a JSON map of security group name to (rule name to rule).
/// The key and value format are persisted on live objects and must stay stable.
pub const SECURITY_RULE_LAST_APPLIED_ANNOTATION: &str =
    "sigs.k8s.io/cluster-api-provider-azure-last-applied-security-rules";

/// Prefix of the tag marking a cloud resource as belonging to a cluster.
/// The full key is the prefix followed by the cluster name.
pub const CLUSTER_TAG_PREFIX: &str = "sigs.k8s.io_cluster-api-provider-azure_cluster_";

/// Tag value for resources whose lifecycle is owned by this controller
pub const RESOURCE_LIFECYCLE_OWNED: &str = "owned";

/// Tag value for resources that exist independently of this controller
pub const RESOURCE_LIFECYCLE_SHARED: &str = "shared";

/// Tag carrying the resource name
pub const NAME_TAG: &str = "Name";

/// Field manager used when patching objects
pub const DEFAULT_FIELD_MANAGER: &str = "security-group-controller";

/// Deadline for a whole convergence pass of one service (seconds)
pub const DEFAULT_SERVICE_RECONCILE_TIMEOUT_SECS: u64 = 12;

/// Requeue interval while a long-running operation is still in flight (seconds)
pub const DEFAULT_IN_PROGRESS_REQUEUE_SECS: u64 = 15;

/// Requeue interval after a fully converged pass (seconds)
pub const DEFAULT_STEADY_STATE_REQUEUE_SECS: u64 = 600;

/// Fibonacci backoff starting value after hard failures (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 30;

/// Fibonacci backoff cap after hard failures (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 600;
