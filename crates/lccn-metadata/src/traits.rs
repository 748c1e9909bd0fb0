//! Subscription repository trait
//!
//! Defines the interface for subscription storage operations.
//! Implementations exist for SQLite and memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lccn_core::normalize::ClauseIndex;
use lccn_core::types::{CanonicalFilter, Subscription};
use lccn_core::{Error, Result};

/// Active subscription in its persisted form
///
/// Carries the length-indexed clause columns next to the raw filter
/// document so readers can reject cheaply before decoding the document.
#[derive(Debug, Clone)]
pub struct StoredSubscription {
    pub id: String,
    pub callback_uri: String,
    /// Raw JSON text of the opaque credentials
    pub authentication: Option<String>,
    pub filter_document: String,
    pub clause_index: ClauseIndex,
    pub created_at: DateTime<Utc>,
}

impl StoredSubscription {
    pub fn from_subscription(subscription: &Subscription) -> Result<Self> {
        let authentication = subscription
            .authentication
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::InternalError(format!("Failed to serialize authentication: {}", e)))?;

        Ok(Self {
            id: subscription.id.clone(),
            callback_uri: subscription.callback_uri.clone(),
            authentication,
            filter_document: subscription.filter.to_document()?,
            clause_index: ClauseIndex::from_filter(&subscription.filter),
            created_at: subscription.created_at,
        })
    }

    /// Duplicate-detection key of this record
    pub fn filter_key(&self) -> &str {
        &self.filter_document
    }

    /// Decode the full record, checking the columns agree with the document
    pub fn decode(&self) -> Result<Subscription> {
        let filter = CanonicalFilter::from_document(&self.filter_document).map_err(|e| {
            Error::DataIntegrity(format!("subscription {}: {}", self.id, e))
        })?;
        self.clause_index
            .verify(&filter)
            .map_err(|e| Error::DataIntegrity(format!("subscription {}: {}", self.id, e)))?;

        let authentication = self
            .authentication
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| {
                Error::DataIntegrity(format!(
                    "subscription {}: malformed authentication: {}",
                    self.id, e
                ))
            })?;

        Ok(Subscription {
            id: self.id.clone(),
            callback_uri: self.callback_uri.clone(),
            authentication,
            filter,
            created_at: self.created_at,
        })
    }
}

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a subscription and its filter as one unit
    ///
    /// Fails with `SubscriptionAlreadyExists` when an active subscription has
    /// the same callback URI and filter. The check and the insert are atomic.
    async fn create_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Active subscription by id
    async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>>;

    /// Active subscriptions in persisted form, oldest first
    async fn list_candidates(&self) -> Result<Vec<StoredSubscription>>;

    /// Ids of active subscriptions with this callback URI and filter key
    async fn find_duplicates(&self, callback_uri: &str, filter_key: &str) -> Result<Vec<String>>;

    /// Mark a subscription deleted
    ///
    /// Returns `false` when it does not exist or is already deleted.
    async fn soft_delete(&self, id: &str) -> Result<bool>;

    /// Active subscriptions, oldest first
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.list_candidates()
            .await?
            .iter()
            .map(StoredSubscription::decode)
            .collect()
    }
}
