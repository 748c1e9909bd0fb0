//! Metrics for subscription management and routing
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding process.

use metrics::{counter, histogram};

/// Metric names
pub mod names {
    pub const SUBSCRIPTION_OPERATIONS_TOTAL: &str = "lccn_subscription_operations_total";
    pub const SUBSCRIPTIONS_EVALUATED_TOTAL: &str = "lccn_subscriptions_evaluated_total";
    pub const NOTIFICATIONS_MATCHED_TOTAL: &str = "lccn_notifications_matched_total";
    pub const MATCH_DURATION_SECONDS: &str = "lccn_match_duration_seconds";
    pub const DATA_INTEGRITY_ERRORS_TOTAL: &str = "lccn_data_integrity_errors_total";
}

/// Lifecycle operations for metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOperation {
    Create,
    Show,
    List,
    Destroy,
}

impl LifecycleOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleOperation::Create => "create",
            LifecycleOperation::Show => "show",
            LifecycleOperation::List => "list",
            LifecycleOperation::Destroy => "destroy",
        }
    }
}

/// Record the outcome of a lifecycle operation
pub fn record_operation<T>(op: LifecycleOperation, result: &lccn_core::Result<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.code(),
    };
    counter!(
        names::SUBSCRIPTION_OPERATIONS_TOTAL,
        "operation" => op.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one routing pass
pub fn record_match(notification_type: &str, evaluated: usize, matched: usize, duration_secs: f64) {
    counter!(names::SUBSCRIPTIONS_EVALUATED_TOTAL).increment(evaluated as u64);
    counter!(
        names::NOTIFICATIONS_MATCHED_TOTAL,
        "notification_type" => notification_type.to_string()
    )
    .increment(matched as u64);
    histogram!(names::MATCH_DURATION_SECONDS).record(duration_secs);
}

pub fn record_data_integrity_error() {
    counter!(names::DATA_INTEGRITY_ERRORS_TOTAL).increment(1);
}
