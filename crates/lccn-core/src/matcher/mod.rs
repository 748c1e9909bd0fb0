//! Subscription matching
//!
//! Pure predicates deciding whether a notification reaches a subscription.
//! Clauses are checked cheapest first and each one rejects on its own:
//! 1. notification type
//! 2. operation type and state, only for operation occurrence notifications
//! 3. instance attributes (see [`instance`])

pub mod instance;

use crate::normalize::ClauseIndex;
use crate::types::{CanonicalFilter, LcmNotificationEvent};
use crate::Result;

pub use instance::instance_matches;

/// Whether a filter admits the event
pub fn matches(filter: &CanonicalFilter, event: &LcmNotificationEvent) -> bool {
    if !filter.notification_types.admits(&event.notification_type) {
        return false;
    }

    if event.is_operation_occurrence() {
        if !filter.operation_types.admits_opt(event.operation_type.as_deref()) {
            return false;
        }
        if !filter.operation_states.admits_opt(event.operation_state.as_deref()) {
            return false;
        }
    }

    instance_matches(&filter.vnf_instance_subscription_filter, &event.vnf_instances)
}

/// Cheap rejection over the length-indexed columns of a persisted filter
///
/// Zero-length columns are never decoded. `Ok(true)` only means the full
/// filter still has to be evaluated with [`matches`].
pub fn prefilter(index: &ClauseIndex, event: &LcmNotificationEvent) -> Result<bool> {
    if !index.notification_types.is_match_all()
        && !index
            .notification_types
            .decode("notification_types")?
            .admits(&event.notification_type)
    {
        return Ok(false);
    }

    if event.is_operation_occurrence() {
        if !index.operation_types.is_match_all()
            && !index
                .operation_types
                .decode("operation_types")?
                .admits_opt(event.operation_type.as_deref())
        {
            return Ok(false);
        }
        if !index.operation_states.is_match_all()
            && !index
                .operation_states
                .decode("operation_states")?
                .admits_opt(event.operation_state.as_deref())
        {
            return Ok(false);
        }
    }

    Ok(true)
}
