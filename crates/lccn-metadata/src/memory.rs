//! In-memory subscription store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lccn_core::types::Subscription;
use lccn_core::{Error, Result};
use tokio::sync::RwLock;
use tracing::debug;

use crate::traits::{StoredSubscription, SubscriptionRepository};

struct Record {
    stored: StoredSubscription,
    deleted_at: Option<DateTime<Utc>>,
}

impl Record {
    fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Subscription store kept in process memory
///
/// Records are held in their persisted form and go through the same decoding
/// as the SQLite store. Deleted records are kept, flagged.
#[derive(Default)]
pub struct MemorySubscriptionStore {
    records: RwLock<Vec<Record>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a persisted record as-is, bypassing duplicate checks
    pub async fn insert_stored(&self, stored: StoredSubscription) {
        self.records.write().await.push(Record {
            stored,
            deleted_at: None,
        });
    }

    /// Number of records, deleted ones included
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionStore {
    async fn create_subscription(&self, subscription: &Subscription) -> Result<()> {
        let stored = StoredSubscription::from_subscription(subscription)?;

        // Check and insert under one write lock
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter().find(|r| {
            r.is_active()
                && r.stored.callback_uri == stored.callback_uri
                && r.stored.filter_key() == stored.filter_key()
        }) {
            return Err(Error::SubscriptionAlreadyExists {
                existing_id: existing.stored.id.clone(),
            });
        }
        if records.iter().any(|r| r.stored.id == stored.id) {
            return Err(Error::InternalError(format!(
                "subscription id {} already used",
                stored.id
            )));
        }

        debug!("Created subscription: {}", stored.id);
        records.push(Record {
            stored,
            deleted_at: None,
        });
        Ok(())
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.is_active() && r.stored.id == id)
            .map(|r| r.stored.decode())
            .transpose()
    }

    async fn list_candidates(&self) -> Result<Vec<StoredSubscription>> {
        let mut active: Vec<StoredSubscription> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.stored.clone())
            .collect();
        active.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(active)
    }

    async fn find_duplicates(&self, callback_uri: &str, filter_key: &str) -> Result<Vec<String>> {
        Ok(self
            .list_candidates()
            .await?
            .into_iter()
            .filter(|s| s.callback_uri == callback_uri && s.filter_key() == filter_key)
            .map(|s| s.id)
            .collect())
    }

    async fn soft_delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.is_active() && r.stored.id == id) {
            Some(record) => {
                record.deleted_at = Some(Utc::now());
                debug!("Soft-deleted subscription: {}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
