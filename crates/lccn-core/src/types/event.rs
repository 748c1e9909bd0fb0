//! Lifecycle notification events
//!
//! An event is the input to matching. It is never persisted here.

use serde::{Deserialize, Serialize};

use crate::OPERATION_OCCURRENCE_NOTIFICATION;

/// Identity attributes of one instance touched by a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnfInstanceDescriptor {
    pub vnfd_id: String,
    pub vnf_provider: String,
    pub vnf_product_name: String,
    pub vnf_software_version: String,
    pub vnfd_version: String,
    pub vnf_instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_instance_name: Option<String>,
}

/// Notification to be routed to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LcmNotificationEvent {
    pub notification_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_state: Option<String>,
    #[serde(default)]
    pub vnf_instances: Vec<VnfInstanceDescriptor>,
}

impl LcmNotificationEvent {
    pub fn new(notification_type: impl Into<String>) -> Self {
        Self {
            notification_type: notification_type.into(),
            operation_type: None,
            operation_state: None,
            vnf_instances: Vec::new(),
        }
    }

    /// Operation occurrence notification for the given operation and state
    pub fn operation_occurrence(
        operation_type: impl Into<String>,
        operation_state: impl Into<String>,
    ) -> Self {
        Self {
            notification_type: OPERATION_OCCURRENCE_NOTIFICATION.to_string(),
            operation_type: Some(operation_type.into()),
            operation_state: Some(operation_state.into()),
            vnf_instances: Vec::new(),
        }
    }

    pub fn with_instance(mut self, instance: VnfInstanceDescriptor) -> Self {
        self.vnf_instances.push(instance);
        self
    }

    /// Whether operation type/state clauses apply to this event
    pub fn is_operation_occurrence(&self) -> bool {
        self.notification_type == OPERATION_OCCURRENCE_NOTIFICATION
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.notification_type.trim().is_empty() {
            return Err(crate::Error::InvalidArgument(
                "notificationType must not be empty".into(),
            ));
        }
        Ok(())
    }
}
