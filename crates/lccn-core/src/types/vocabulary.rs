//! SOL003 vocabularies for notification types, operation types and states

use crate::types::CanonicalFilter;
use crate::{Error, Result, OPERATION_OCCURRENCE_NOTIFICATION};

pub const NOTIFICATION_TYPES: &[&str] = &[
    crate::OPERATION_OCCURRENCE_NOTIFICATION,
    crate::IDENTIFIER_CREATION_NOTIFICATION,
    crate::IDENTIFIER_DELETION_NOTIFICATION,
];

pub const OPERATION_TYPES: &[&str] = &[
    "INSTANTIATE",
    "SCALE",
    "SCALE_TO_LEVEL",
    "CHANGE_FLAVOUR",
    "TERMINATE",
    "HEAL",
    "OPERATE",
    "CHANGE_EXT_CONN",
    "MODIFY_INFO",
    "CHANGE_VNFPKG",
];

pub const OPERATION_STATES: &[&str] = &[
    "STARTING",
    "PROCESSING",
    "COMPLETED",
    "FAILED_TEMP",
    "FAILED",
    "ROLLING_BACK",
    "ROLLED_BACK",
];

/// Check a filter against the SOL003 vocabularies
pub fn validate_filter(filter: &CanonicalFilter) -> Result<()> {
    check_members("notificationTypes", filter.notification_types.iter(), NOTIFICATION_TYPES)?;
    check_members("operationTypes", filter.operation_types.iter(), OPERATION_TYPES)?;
    check_members("operationStates", filter.operation_states.iter(), OPERATION_STATES)?;

    let operation_clauses =
        !filter.operation_types.is_match_all() || !filter.operation_states.is_match_all();
    if operation_clauses && !filter.notification_types.admits(OPERATION_OCCURRENCE_NOTIFICATION) {
        return Err(Error::InvalidFilter(format!(
            "operationTypes/operationStates require notificationTypes to include {}",
            OPERATION_OCCURRENCE_NOTIFICATION
        )));
    }

    Ok(())
}

fn check_members<'a>(
    field: &str,
    values: impl Iterator<Item = &'a str>,
    known: &[&str],
) -> Result<()> {
    for value in values {
        if !known.contains(&value) {
            return Err(Error::InvalidFilter(format!(
                "unknown value {:?} in {}",
                value, field
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_filter;
    use crate::types::LccnSubscriptionFilter;

    #[test]
    fn test_known_values_pass() {
        let filter = normalize_filter(Some(
            &LccnSubscriptionFilter::new()
                .with_notification_types(OPERATION_OCCURRENCE_NOTIFICATION)
                .with_operation_types(vec!["INSTANTIATE", "HEAL"])
                .with_operation_states("COMPLETED"),
        ))
        .unwrap();
        assert!(validate_filter(&filter).is_ok());
        assert!(validate_filter(&CanonicalFilter::match_all()).is_ok());
    }

    #[test]
    fn test_unknown_values_rejected() {
        let filter = normalize_filter(Some(
            &LccnSubscriptionFilter::new().with_operation_types("EXPLODE"),
        ))
        .unwrap();
        assert!(matches!(validate_filter(&filter), Err(Error::InvalidFilter(_))));
    }

    #[test]
    fn test_operation_clause_needs_occurrence_type() {
        let filter = normalize_filter(Some(
            &LccnSubscriptionFilter::new()
                .with_notification_types(crate::IDENTIFIER_CREATION_NOTIFICATION)
                .with_operation_types("INSTANTIATE"),
        ))
        .unwrap();
        assert!(matches!(validate_filter(&filter), Err(Error::InvalidFilter(_))));
    }
}
