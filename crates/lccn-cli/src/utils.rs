//! Utility functions for the LCCN CLI

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

/// Format a datetime for display
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse a JSON argument given inline or as `@path`
pub fn read_json_arg<T: DeserializeOwned>(arg: &str, what: &str) -> Result<T> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} from {}", what, path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid {} JSON", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lccn_core::types::{LccnSubscriptionFilter, LcmNotificationEvent};
    use std::io::Write;

    #[test]
    fn test_read_inline_json() {
        let filter: LccnSubscriptionFilter =
            read_json_arg(r#"{"operationTypes": "INSTANTIATE"}"#, "filter").unwrap();
        assert!(filter.operation_types.is_some());
        assert!(filter.notification_types.is_none());
    }

    #[test]
    fn test_read_json_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"notificationType": "VnfIdentifierCreationNotification"}}"#
        )
        .unwrap();

        let arg = format!("@{}", file.path().display());
        let event: LcmNotificationEvent = read_json_arg(&arg, "event").unwrap();
        assert_eq!(event.notification_type, "VnfIdentifierCreationNotification");
        assert!(event.vnf_instances.is_empty());
    }

    #[test]
    fn test_read_json_errors() {
        assert!(read_json_arg::<LcmNotificationEvent>("{not json", "event").is_err());
        assert!(read_json_arg::<LcmNotificationEvent>("@/nonexistent/event.json", "event").is_err());
    }
}
