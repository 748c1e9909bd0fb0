//! Subscription lifecycle management
//!
//! A subscription is ACTIVE from creation until it is destroyed, after which
//! it is DELETED for good. Destroyed subscriptions stay in the store, flagged,
//! and are invisible to every read.

use std::sync::Arc;

use lccn_core::config::SubscriptionConfig;
use lccn_core::normalize::normalize_filter;
use lccn_core::types::{vocabulary, LccnSubscriptionFilter, LccnSubscriptionRequest, Subscription};
use lccn_core::{Error, Result, MAX_CALLBACK_URI_LENGTH};
use lccn_metadata::SubscriptionRepository;
use tracing::{debug, info};
use url::Url;

use crate::metrics::{record_operation, LifecycleOperation};

/// Create/show/list/destroy over subscriptions
#[derive(Clone)]
pub struct SubscriptionManager {
    store: Arc<dyn SubscriptionRepository>,
    config: SubscriptionConfig,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn SubscriptionRepository>, config: SubscriptionConfig) -> Self {
        Self { store, config }
    }

    /// Register a subscription
    ///
    /// Fails with `SubscriptionAlreadyExists` when an active subscription has
    /// the same callback URI and an equivalent filter.
    pub async fn create(
        &self,
        callback_uri: &str,
        authentication: Option<serde_json::Value>,
        filter: Option<&LccnSubscriptionFilter>,
    ) -> Result<Subscription> {
        let result = self.create_inner(callback_uri, authentication, filter).await;
        record_operation(LifecycleOperation::Create, &result);
        result
    }

    pub async fn create_from_request(&self, request: &LccnSubscriptionRequest) -> Result<Subscription> {
        self.create(
            &request.callback_uri,
            request.authentication.clone(),
            request.filter.as_ref(),
        )
        .await
    }

    async fn create_inner(
        &self,
        callback_uri: &str,
        authentication: Option<serde_json::Value>,
        filter: Option<&LccnSubscriptionFilter>,
    ) -> Result<Subscription> {
        self.validate_callback_uri(callback_uri)?;

        let filter = normalize_filter(filter)?;
        if self.config.strict_vocabulary {
            vocabulary::validate_filter(&filter)?;
        }

        // Fast rejection; the store repeats the check atomically on insert
        let key = filter.to_document()?;
        if let Some(existing_id) = self
            .store
            .find_duplicates(callback_uri, &key)
            .await?
            .into_iter()
            .next()
        {
            debug!(
                "Rejecting duplicate subscription for {} (existing {})",
                callback_uri, existing_id
            );
            return Err(Error::SubscriptionAlreadyExists { existing_id });
        }

        let subscription = Subscription::new(callback_uri, authentication, filter);
        self.store.create_subscription(&subscription).await?;

        info!(
            "Created subscription {} for {}",
            subscription.id, subscription.callback_uri
        );
        Ok(subscription)
    }

    /// Active subscription by id
    pub async fn show(&self, id: &str) -> Result<Subscription> {
        let result = self
            .store
            .get_subscription(id)
            .await
            .and_then(|s| s.ok_or_else(|| Error::NoSuchSubscription(id.to_string())));
        record_operation(LifecycleOperation::Show, &result);
        result
    }

    /// All active subscriptions, oldest first
    pub async fn list(&self) -> Result<Vec<Subscription>> {
        let result = self.store.list_subscriptions().await;
        record_operation(LifecycleOperation::List, &result);
        result
    }

    /// Soft-delete a subscription
    ///
    /// Unknown and already-deleted ids both fail with `NoSuchSubscription`.
    pub async fn destroy(&self, id: &str) -> Result<()> {
        let result = match self.store.soft_delete(id).await {
            Ok(true) => {
                info!("Deleted subscription {}", id);
                Ok(())
            }
            Ok(false) => Err(Error::NoSuchSubscription(id.to_string())),
            Err(e) => Err(e),
        };
        record_operation(LifecycleOperation::Destroy, &result);
        result
    }

    fn validate_callback_uri(&self, callback_uri: &str) -> Result<()> {
        if callback_uri.len() > MAX_CALLBACK_URI_LENGTH {
            return Err(Error::InvalidArgument(format!(
                "callbackUri exceeds {} characters",
                MAX_CALLBACK_URI_LENGTH
            )));
        }

        let url = Url::parse(callback_uri)
            .map_err(|e| Error::InvalidArgument(format!("invalid callbackUri: {}", e)))?;

        if !self
            .config
            .allowed_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(url.scheme()))
        {
            return Err(Error::InvalidArgument(format!(
                "callbackUri scheme {:?} is not allowed",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(Error::InvalidArgument("callbackUri has no host".into()));
        }
        Ok(())
    }
}
