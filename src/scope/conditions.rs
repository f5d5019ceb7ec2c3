//! # Conditions
//!
//! Readiness conditions derived from the result of a pass.

use crate::convergence::ConvergenceError;
use crate::crd::{Condition, ConditionSeverity, ConditionStatus};
use chrono::{DateTime, Utc};

pub const CREATING_REASON: &str = "Creating";
pub const FAILED_REASON: &str = "Failed";
pub const DELETING_REASON: &str = "Deleting";
pub const DELETED_REASON: &str = "Deleted";
pub const DELETION_FAILED_REASON: &str = "DeletionFailed";

/// Condition after a reconcile pass
#[must_use]
pub fn put_condition(
    condition_type: &str,
    service_name: &str,
    err: Option<&ConvergenceError>,
    now: DateTime<Utc>,
) -> Condition {
    match err {
        None => Condition {
            r#type: condition_type.to_string(),
            status: ConditionStatus::True,
            severity: None,
            reason: None,
            message: None,
            last_transition_time: now,
        },
        Some(e) if e.is_operation_not_done() => mark_false(
            condition_type,
            CREATING_REASON,
            ConditionSeverity::Info,
            format!("{service_name} creation is in progress: {e}"),
            now,
        ),
        Some(e) => mark_false(
            condition_type,
            FAILED_REASON,
            ConditionSeverity::Error,
            format!("{service_name} failed to create or update. err: {e}"),
            now,
        ),
    }
}

/// Condition after a delete pass
#[must_use]
pub fn delete_condition(
    condition_type: &str,
    service_name: &str,
    err: Option<&ConvergenceError>,
    now: DateTime<Utc>,
) -> Condition {
    match err {
        None => mark_false(
            condition_type,
            DELETED_REASON,
            ConditionSeverity::Info,
            format!("{service_name} successfully deleted"),
            now,
        ),
        Some(e) if e.is_operation_not_done() => mark_false(
            condition_type,
            DELETING_REASON,
            ConditionSeverity::Info,
            format!("{service_name} deletion is in progress: {e}"),
            now,
        ),
        Some(e) => mark_false(
            condition_type,
            DELETION_FAILED_REASON,
            ConditionSeverity::Error,
            format!("{service_name} failed to delete. err: {e}"),
            now,
        ),
    }
}

fn mark_false(
    condition_type: &str,
    reason: &str,
    severity: ConditionSeverity,
    message: String,
    now: DateTime<Utc>,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: ConditionStatus::False,
        severity: Some(severity),
        reason: Some(reason.to_string()),
        message: Some(message),
        last_transition_time: now,
    }
}

/// Insert or replace the condition of the same type.
///
/// The previous transition time is kept when the status did not change.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

#[must_use]
pub fn find_condition<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}
