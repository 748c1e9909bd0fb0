//! SQLite subscription repository

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use lccn_core::config::DatabaseConfig;
use lccn_core::normalize::{ClauseIndex, IndexedClause};
use lccn_core::types::Subscription;
use lccn_core::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

use crate::traits::{StoredSubscription, SubscriptionRepository};

// id, callback_uri, authentication, created_at, filter,
// notification_types(+len), operation_types(+len), operation_states(+len)
type CandidateRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    i64,
    Option<String>,
    i64,
    Option<String>,
    i64,
);

const SELECT_ACTIVE: &str = r#"
    SELECT s.id, s.callback_uri, s.authentication, s.created_at, f.filter,
           f.notification_types, f.notification_types_len,
           f.operation_types, f.operation_types_len,
           f.operation_states, f.operation_states_len
    FROM lcm_subscriptions s
    JOIN lcm_filters f ON f.subscription_id = s.id
    WHERE s.deleted = 0
"#;

pub struct SqliteSubscriptionStore {
    pool: SqlitePool,
}

impl SqliteSubscriptionStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_config(&DatabaseConfig {
            url: database_url.to_string(),
            ..DatabaseConfig::default()
        })
        .await
    }

    pub async fn with_config(config: &DatabaseConfig) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| Error::DatabaseError(e.to_string()))?
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let mut options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections);

        // Every connection to an in-memory database sees its own database
        if config.url.contains(":memory:") {
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options
            .connect_with(connect_options)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init(&self) -> Result<()> {
        // deleted: 1 once destroyed; rows are never removed
        // filter_key: canonical filter document, the duplicate-detection key
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lcm_subscriptions (
                id TEXT PRIMARY KEY,
                callback_uri TEXT NOT NULL,
                authentication TEXT,
                filter_key TEXT NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0,
                deleted_at TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_lcm_subscriptions_active_filter
            ON lcm_subscriptions(callback_uri, filter_key) WHERE deleted = 0
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        // *_len columns: 0 means the clause matches everything
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lcm_filters (
                subscription_id TEXT PRIMARY KEY REFERENCES lcm_subscriptions(id),
                filter TEXT NOT NULL,
                notification_types TEXT,
                notification_types_len INTEGER NOT NULL DEFAULT 0,
                operation_types TEXT,
                operation_types_len INTEGER NOT NULL DEFAULT 0,
                operation_states TEXT,
                operation_states_len INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        info!("Subscription store initialized");
        Ok(())
    }

    async fn insert_locked(conn: &mut SqliteConnection, stored: &StoredSubscription) -> Result<()> {
        let existing = Self::active_duplicate(conn, stored).await?;
        if let Some(existing_id) = existing {
            return Err(Error::SubscriptionAlreadyExists { existing_id });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO lcm_subscriptions (id, callback_uri, authentication, filter_key, deleted, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.callback_uri)
        .bind(&stored.authentication)
        .bind(stored.filter_key())
        .bind(format_timestamp(&stored.created_at))
        .execute(&mut *conn)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                // Only a live duplicate is a conflict
                if let Some(existing_id) = Self::active_duplicate(conn, stored).await? {
                    return Err(Error::SubscriptionAlreadyExists { existing_id });
                }
            }
            return Err(Error::DatabaseError(e.to_string()));
        }

        let index = &stored.clause_index;
        sqlx::query(
            r#"
            INSERT INTO lcm_filters (
                subscription_id, filter,
                notification_types, notification_types_len,
                operation_types, operation_types_len,
                operation_states, operation_states_len
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.filter_document)
        .bind(&index.notification_types.values)
        .bind(index.notification_types.len)
        .bind(&index.operation_types.values)
        .bind(index.operation_types.len)
        .bind(&index.operation_states.values)
        .bind(index.operation_states.len)
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn active_duplicate(
        conn: &mut SqliteConnection,
        stored: &StoredSubscription,
    ) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM lcm_subscriptions
            WHERE callback_uri = ? AND filter_key = ? AND deleted = 0
            LIMIT 1
            "#,
        )
        .bind(&stored.callback_uri)
        .bind(stored.filter_key())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        Ok(row.map(|(id,)| id))
    }

    fn row_to_stored(row: CandidateRow) -> Result<StoredSubscription> {
        let created_at = DateTime::parse_from_rfc3339(&row.3)
            .map_err(|e| {
                Error::DataIntegrity(format!("subscription {}: bad created_at: {}", row.0, e))
            })?
            .with_timezone(&Utc);

        Ok(StoredSubscription {
            id: row.0,
            callback_uri: row.1,
            authentication: row.2,
            filter_document: row.4,
            clause_index: ClauseIndex {
                notification_types: IndexedClause {
                    values: row.5,
                    len: row.6,
                },
                operation_types: IndexedClause {
                    values: row.7,
                    len: row.8,
                },
                operation_states: IndexedClause {
                    values: row.9,
                    len: row.10,
                },
            },
            created_at,
        })
    }
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    // Fixed width so that text order is time order
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl SubscriptionRepository for SqliteSubscriptionStore {
    async fn create_subscription(&self, subscription: &Subscription) -> Result<()> {
        let stored = StoredSubscription::from_subscription(subscription)?;

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        // Write lock before the duplicate check; concurrent writers wait on busy_timeout
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        let result = Self::insert_locked(&mut conn, &stored).await;
        let finish = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
        if let Err(e) = sqlx::query(finish).execute(&mut *conn).await {
            if result.is_ok() {
                return Err(Error::DatabaseError(e.to_string()));
            }
            warn!("Rollback of subscription {} failed: {}", stored.id, e);
        }
        result?;

        debug!("Created subscription: {}", stored.id);
        Ok(())
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>> {
        let query = format!("{} AND s.id = ?", SELECT_ACTIVE);
        let row: Option<CandidateRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        row.map(|r| Self::row_to_stored(r)?.decode()).transpose()
    }

    async fn list_candidates(&self) -> Result<Vec<StoredSubscription>> {
        let query = format!("{} ORDER BY s.created_at, s.id", SELECT_ACTIVE);
        let rows: Vec<CandidateRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        rows.into_iter().map(Self::row_to_stored).collect()
    }

    async fn find_duplicates(&self, callback_uri: &str, filter_key: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM lcm_subscriptions
            WHERE callback_uri = ? AND filter_key = ? AND deleted = 0
            ORDER BY created_at, id
            "#,
        )
        .bind(callback_uri)
        .bind(filter_key)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn soft_delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE lcm_subscriptions SET deleted = 1, deleted_at = ?
            WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            debug!("Soft-deleted subscription: {}", id);
        }
        Ok(deleted)
    }
}
