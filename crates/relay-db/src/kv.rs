//! # Key-Value Store
//!
//! The storage capability the metadata repository is written against:
//! atomic single-key put/get/delete inside a named collection, plus full key
//! enumeration.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KvStore (trait)                                │
//! │                                                                         │
//! │   ┌──────────────────────────────┐   ┌───────────────────────────────┐ │
//! │   │        SqliteKvStore         │   │        MemoryKvStore          │ │
//! │   │  kv_entries(collection, key, │   │  BTreeMap per collection      │ │
//! │   │  value), upsert on put       │   │  behind a tokio Mutex         │ │
//! │   │  (production)                │   │  (tests, ephemeral runs)      │ │
//! │   └──────────────────────────────┘   └───────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are raw bytes. Enumeration order is byte order for both stores.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Trait
// =============================================================================

/// Collection-scoped key-value storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Writes `value` under `key`, overwriting any existing value.
    async fn put(&self, collection: &str, key: &[u8], value: &[u8]) -> DbResult<()>;

    /// Reads the value under `key`; `None` when absent.
    async fn get(&self, collection: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    /// Deletes `key`. Deleting an absent key succeeds.
    async fn delete(&self, collection: &str, key: &[u8]) -> DbResult<()>;

    /// Lists every key in the collection.
    async fn keys(&self, collection: &str) -> DbResult<Vec<Vec<u8>>>;
}

// =============================================================================
// SQLite Store
// =============================================================================

/// Production store backed by the `kv_entries` table.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Creates a store over a migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteKvStore { pool }
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn put(&self, collection: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        debug!(collection = %collection, key_len = key.len(), "kv put");

        sqlx::query(
            r#"
            INSERT INTO kv_entries (collection, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT (collection, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, collection: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT value FROM kv_entries WHERE collection = ?1 AND key = ?2")
                .bind(collection)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    async fn delete(&self, collection: &str, key: &[u8]) -> DbResult<()> {
        debug!(collection = %collection, key_len = key.len(), "kv delete");

        sqlx::query("DELETE FROM kv_entries WHERE collection = ?1 AND key = ?2")
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn keys(&self, collection: &str) -> DbResult<Vec<Vec<u8>>> {
        let rows = sqlx::query("SELECT key FROM kv_entries WHERE collection = ?1 ORDER BY key")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<Vec<u8>, _>("key").map_err(Into::into))
            .collect()
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    collections: Mutex<HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn put(&self, collection: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn get(&self, collection: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self
            .collections
            .lock()
            .await
            .get(collection)
            .and_then(|entries| entries.get(key).cloned()))
    }

    async fn delete(&self, collection: &str, key: &[u8]) -> DbResult<()> {
        if let Some(entries) = self.collections.lock().await.get_mut(collection) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn keys(&self, collection: &str) -> DbResult<Vec<Vec<u8>>> {
        Ok(self
            .collections
            .lock()
            .await
            .get(collection)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
