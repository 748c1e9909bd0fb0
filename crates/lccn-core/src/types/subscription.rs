//! Subscription types

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CanonicalFilter, LccnSubscriptionFilter};

/// Subscription request as received from the administrative API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LccnSubscriptionRequest {
    pub callback_uri: String,
    /// Opaque credentials used when calling the callback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<LccnSubscriptionFilter>,
}

/// Active subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub callback_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<serde_json::Value>,
    pub filter: CanonicalFilter,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        callback_uri: impl Into<String>,
        authentication: Option<serde_json::Value>,
        filter: CanonicalFilter,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            callback_uri: callback_uri.into(),
            authentication,
            filter,
            // Stores keep microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// View without credentials
    pub fn info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            id: self.id.clone(),
            callback_uri: self.callback_uri.clone(),
            filter: self.filter.clone(),
            created_at: self.created_at,
        }
    }

    pub fn delivery_target(&self) -> DeliveryTarget {
        DeliveryTarget {
            subscription_id: self.id.clone(),
            callback_uri: self.callback_uri.clone(),
            authentication: self.authentication.clone(),
        }
    }
}

/// Subscription as shown to API clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub id: String,
    pub callback_uri: String,
    pub filter: CanonicalFilter,
    pub created_at: DateTime<Utc>,
}

/// Where a matching notification has to be delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTarget {
    pub subscription_id: String,
    pub callback_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<serde_json::Value>,
}
