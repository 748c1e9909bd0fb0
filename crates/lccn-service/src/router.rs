//! Notification routing
//!
//! Resolves which active subscriptions receive a lifecycle notification.
//! Delivery itself happens elsewhere; this only produces the targets.

use std::sync::Arc;
use std::time::Instant;

use lccn_core::matcher::{matches, prefilter};
use lccn_core::types::{DeliveryTarget, LcmNotificationEvent};
use lccn_core::{Error, Result};
use lccn_metadata::{StoredSubscription, SubscriptionRepository};
use tracing::{debug, error};

use crate::metrics::{record_data_integrity_error, record_match};

/// Matches notifications against the active subscriptions of a store
#[derive(Clone)]
pub struct NotificationRouter {
    store: Arc<dyn SubscriptionRepository>,
}

impl NotificationRouter {
    pub fn new(store: Arc<dyn SubscriptionRepository>) -> Self {
        Self { store }
    }

    /// Delivery targets for every active subscription admitting the event
    ///
    /// Targets come back oldest subscription first. A corrupt persisted filter
    /// aborts the whole call with `DataIntegrity` instead of being skipped.
    pub async fn find_matching_subscriptions(
        &self,
        event: &LcmNotificationEvent,
    ) -> Result<Vec<DeliveryTarget>> {
        event.validate()?;

        let start = Instant::now();
        let candidates = self.store.list_candidates().await?;
        let targets = match_candidates(&candidates, event).inspect_err(|e| {
            if matches!(e, Error::DataIntegrity(_)) {
                error!("Routing {} aborted: {}", event.notification_type, e);
                record_data_integrity_error();
            }
        })?;

        record_match(
            &event.notification_type,
            candidates.len(),
            targets.len(),
            start.elapsed().as_secs_f64(),
        );
        debug!(
            "{} matched {} of {} subscriptions",
            event.notification_type,
            targets.len(),
            candidates.len()
        );
        Ok(targets)
    }
}

/// Evaluate persisted subscriptions against an event, keeping their order
pub fn match_candidates(
    candidates: &[StoredSubscription],
    event: &LcmNotificationEvent,
) -> Result<Vec<DeliveryTarget>> {
    let mut targets = Vec::new();
    for candidate in candidates {
        let admitted = prefilter(&candidate.clause_index, event).map_err(|e| match e {
            Error::DataIntegrity(msg) => {
                Error::DataIntegrity(format!("subscription {}: {}", candidate.id, msg))
            }
            other => other,
        })?;
        if !admitted {
            continue;
        }

        let subscription = candidate.decode()?;
        if matches(&subscription.filter, event) {
            targets.push(subscription.delivery_target());
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lccn_core::config::SubscriptionConfig;
    use lccn_core::types::{
        LccnSubscriptionFilter, VnfInstanceDescriptor, VnfInstanceSubscriptionFilter,
        VnfProduct, VnfProductVersion, VnfProductsFromProvider,
    };
    use lccn_core::{IDENTIFIER_CREATION_NOTIFICATION, OPERATION_OCCURRENCE_NOTIFICATION};
    use lccn_metadata::{MemorySubscriptionStore, SqliteSubscriptionStore};

    use crate::SubscriptionManager;

    fn instance(id: &str, provider: &str, product: &str) -> VnfInstanceDescriptor {
        VnfInstanceDescriptor {
            vnfd_id: "vnfd-1".into(),
            vnf_provider: provider.into(),
            vnf_product_name: product.into(),
            vnf_software_version: "1.0".into(),
            vnfd_version: "t1".into(),
            vnf_instance_id: id.into(),
            vnf_instance_name: None,
        }
    }

    fn setup(store: Arc<dyn SubscriptionRepository>) -> (SubscriptionManager, NotificationRouter) {
        (
            SubscriptionManager::new(store.clone(), SubscriptionConfig::default()),
            NotificationRouter::new(store),
        )
    }

    fn ids(targets: &[DeliveryTarget]) -> Vec<&str> {
        targets.iter().map(|t| t.subscription_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_routing_selects_matching_subscriptions() {
        let (manager, router) = setup(Arc::new(MemorySubscriptionStore::new()));

        let everything = manager.create("http://all.example.com", None, None).await.unwrap();
        let instantiate = manager
            .create(
                "http://ops.example.com",
                None,
                Some(
                    &LccnSubscriptionFilter::new()
                        .with_notification_types(OPERATION_OCCURRENCE_NOTIFICATION)
                        .with_operation_types("INSTANTIATE")
                        .with_operation_states("COMPLETED"),
                ),
            )
            .await
            .unwrap();
        let creation = manager
            .create(
                "http://ids.example.com",
                None,
                Some(&LccnSubscriptionFilter::new().with_notification_types(IDENTIFIER_CREATION_NOTIFICATION)),
            )
            .await
            .unwrap();

        let event = LcmNotificationEvent::operation_occurrence("INSTANTIATE", "COMPLETED");
        let targets = router.find_matching_subscriptions(&event).await.unwrap();
        assert_eq!(ids(&targets), vec![everything.id.as_str(), instantiate.id.as_str()]);

        let event = LcmNotificationEvent::operation_occurrence("INSTANTIATE", "PROCESSING");
        let targets = router.find_matching_subscriptions(&event).await.unwrap();
        assert_eq!(ids(&targets), vec![everything.id.as_str()]);

        let event = LcmNotificationEvent::new(IDENTIFIER_CREATION_NOTIFICATION);
        let targets = router.find_matching_subscriptions(&event).await.unwrap();
        assert_eq!(ids(&targets), vec![everything.id.as_str(), creation.id.as_str()]);
    }

    #[tokio::test]
    async fn test_deleted_subscriptions_never_match() {
        let (manager, router) = setup(Arc::new(MemorySubscriptionStore::new()));
        let sub = manager.create("http://x.example.com", None, None).await.unwrap();
        manager.destroy(&sub.id).await.unwrap();

        let event = LcmNotificationEvent::new(IDENTIFIER_CREATION_NOTIFICATION);
        assert!(router.find_matching_subscriptions(&event).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_tree_routing() {
        let (manager, router) = setup(Arc::new(MemorySubscriptionStore::new()));
        let filter = LccnSubscriptionFilter::new().with_instance_filter(VnfInstanceSubscriptionFilter {
            vnf_products_from_providers: Some(vec![VnfProductsFromProvider {
                vnf_provider: "P1".into(),
                vnf_products: Some(vec![VnfProduct {
                    vnf_product_name: "A".into(),
                    versions: Some(vec![VnfProductVersion {
                        vnf_software_version: "1.0".into(),
                        vnfd_versions: Some("t1".into()),
                    }]),
                }]),
            }]),
            ..Default::default()
        });
        let sub = manager
            .create("http://x.example.com", None, Some(&filter))
            .await
            .unwrap();

        let hit = LcmNotificationEvent::new(IDENTIFIER_CREATION_NOTIFICATION)
            .with_instance(instance("i-1", "P1", "A"));
        assert_eq!(
            ids(&router.find_matching_subscriptions(&hit).await.unwrap()),
            vec![sub.id.as_str()]
        );

        let miss = LcmNotificationEvent::new(IDENTIFIER_CREATION_NOTIFICATION)
            .with_instance(instance("i-1", "P1", "B"));
        assert!(router.find_matching_subscriptions(&miss).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_targets_carry_credentials() {
        let (manager, router) = setup(Arc::new(MemorySubscriptionStore::new()));
        let auth = serde_json::json!({"authType": ["BASIC"], "paramsBasic": {"userName": "nfvo"}});
        manager
            .create("http://x.example.com/cb", Some(auth.clone()), None)
            .await
            .unwrap();

        let targets = router
            .find_matching_subscriptions(&LcmNotificationEvent::new(IDENTIFIER_CREATION_NOTIFICATION))
            .await
            .unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].callback_uri, "http://x.example.com/cb");
        assert_eq!(targets[0].authentication, Some(auth));
    }

    #[tokio::test]
    async fn test_invalid_event_rejected() {
        let (_, router) = setup(Arc::new(MemorySubscriptionStore::new()));
        let err = router
            .find_matching_subscriptions(&LcmNotificationEvent::new("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_corrupt_filter_aborts_routing_on_sqlite() {
        let store = Arc::new(SqliteSubscriptionStore::new("sqlite::memory:").await.unwrap());
        let (manager, router) = setup(store.clone());

        manager.create("http://a.example.com", None, None).await.unwrap();
        let bad = manager
            .create(
                "http://b.example.com",
                None,
                Some(&LccnSubscriptionFilter::new().with_notification_types(IDENTIFIER_CREATION_NOTIFICATION)),
            )
            .await
            .unwrap();

        let event = LcmNotificationEvent::new(IDENTIFIER_CREATION_NOTIFICATION);
        assert_eq!(router.find_matching_subscriptions(&event).await.unwrap().len(), 2);

        sqlx::query("UPDATE lcm_filters SET notification_types = 'garbage' WHERE subscription_id = ?")
            .bind(&bad.id)
            .execute(store.pool())
            .await
            .unwrap();

        let err = router.find_matching_subscriptions(&event).await.unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_length_index_skips_decoding() {
        let store = Arc::new(SqliteSubscriptionStore::new("sqlite::memory:").await.unwrap());
        let (manager, router) = setup(store.clone());

        let sub = manager
            .create(
                "http://a.example.com",
                None,
                Some(&LccnSubscriptionFilter::new().with_notification_types(IDENTIFIER_CREATION_NOTIFICATION)),
            )
            .await
            .unwrap();

        // A corrupt document is not reached when the indexed column rejects
        sqlx::query("UPDATE lcm_filters SET filter = 'not json' WHERE subscription_id = ?")
            .bind(&sub.id)
            .execute(store.pool())
            .await
            .unwrap();

        let event = LcmNotificationEvent::operation_occurrence("HEAL", "COMPLETED");
        assert!(router.find_matching_subscriptions(&event).await.unwrap().is_empty());
    }
}
