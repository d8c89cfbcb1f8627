//! # Metadata Repository
//!
//! Dual-indexed persistence for [`UploadRecord`]s.
//!
//! ## The Dual-Key Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One record, two keys, one collection                    │
//! │                                                                         │
//! │  store(record)                                                         │
//! │       │                                                                 │
//! │       ├──► put(collection, session_id,                 json) ① primary │
//! │       └──► put(collection, serial + log_collection_ts, json) ② unique  │
//! │                                                                         │
//! │  ① then ②. If ② fails, ① stays written and the call fails.            │
//! │                                                                         │
//! │  remove(session_id)                                                    │
//! │       │                                                                 │
//! │       ├──► find_by_id(session_id)      (nothing deleted if this fails) │
//! │       ├──► delete ①, delete ②          (both attempted, errors kept)   │
//! │       └──► invoker.remove(session_id)  (blob discarded last)           │
//! │                                                                         │
//! │  read_all()                                                            │
//! │       └──► keys(collection) where key.len() == 32   (primary keys only)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two writes are separate store calls, so a crash between them leaves
//! only the primary copy behind.

use std::sync::Arc;

use tracing::{debug, info, warn};

use relay_core::{UploadRecord, ValidationError, SESSION_ID_LEN};

use crate::error::{DbError, DbResult};
use crate::invoker::UploadStoreInvoker;
use crate::kv::KvStore;

/// Repository over a [`KvStore`] collection.
#[derive(Clone)]
pub struct MetadataRepository {
    store: Arc<dyn KvStore>,
    invoker: Arc<dyn UploadStoreInvoker>,
    collection: String,
}

impl std::fmt::Debug for MetadataRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataRepository")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl MetadataRepository {
    /// Creates a repository bound to `collection`.
    ///
    /// ## Errors
    /// `DbError::Config` when the collection name is empty.
    pub fn new(
        store: Arc<dyn KvStore>,
        invoker: Arc<dyn UploadStoreInvoker>,
        collection: impl Into<String>,
    ) -> DbResult<Self> {
        let collection = collection.into();
        if collection.is_empty() {
            return Err(DbError::Config("collection name may not be empty".to_string()));
        }
        Ok(MetadataRepository {
            store,
            invoker,
            collection,
        })
    }

    /// Name of the backing collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Writes `record` under its session id and its composite key.
    ///
    /// ## Errors
    /// - `Validation` if either key would be empty (nothing is written)
    /// - Store errors from either write; a failed second write does not
    ///   undo the first
    pub async fn store(&self, record: &UploadRecord) -> DbResult<()> {
        if record.session_id.is_empty() {
            return Err(ValidationError::required("SessionID").into());
        }
        let composite = record.composite_key();
        if composite.is_empty() {
            return Err(ValidationError::required("SerialNumber").into());
        }

        let value = serde_json::to_vec(record).map_err(|e| DbError::Internal(e.to_string()))?;

        self.store
            .put(&self.collection, record.session_id.as_bytes(), &value)
            .await?;
        self.store
            .put(&self.collection, composite.as_bytes(), &value)
            .await?;

        debug!(session_id = %record.session_id, "Stored upload record");
        Ok(())
    }

    /// Looks a record up by either of its keys.
    ///
    /// ## Errors
    /// - `NotFound` if the key is absent
    /// - `Corruption` if the stored bytes don't decode
    pub async fn find_by_id(&self, key: &str) -> DbResult<UploadRecord> {
        let bytes = self
            .store
            .get(&self.collection, key.as_bytes())
            .await?
            .ok_or_else(|| DbError::not_found("UploadRecord", key))?;

        serde_json::from_slice(&bytes).map_err(|e| DbError::corruption(key, e))
    }

    /// Merges the non-empty fields of `patch` into the stored record with the
    /// same session id and writes the result back under both keys.
    ///
    /// Returns the merged record.
    pub async fn update(&self, patch: &UploadRecord) -> DbResult<UploadRecord> {
        let mut record = self.find_by_id(&patch.session_id).await?;
        record.merge_from(patch);
        self.store(&record).await?;
        Ok(record)
    }

    /// Deletes both copies of a record and then discards its blob.
    ///
    /// ## Errors
    /// - Lookup errors: nothing is deleted
    /// - `PartialDelete` if any key deletion failed; the blob is kept
    /// - Invoker errors from the blob store
    pub async fn remove(&self, session_id: &str) -> DbResult<()> {
        let record = self.find_by_id(session_id).await?;

        let keys = [record.session_id.clone(), record.composite_key()];
        let mut failures = Vec::new();
        for key in &keys {
            if let Err(e) = self.store.delete(&self.collection, key.as_bytes()).await {
                warn!(session_id = %session_id, key = %key, ?e, "Failed to delete key");
                failures.push(format!("{}: {}", key, e));
            }
        }
        if !failures.is_empty() {
            return Err(DbError::PartialDelete { failures });
        }

        self.invoker.remove(&record.session_id).await?;

        info!(session_id = %session_id, "Removed upload record");
        Ok(())
    }

    /// Lists the session ids of every stored record.
    ///
    /// Keys whose length differs from a session id are skipped, which leaves
    /// out the composite-key copies.
    pub async fn read_all(&self) -> DbResult<Vec<String>> {
        let keys = self.store.keys(&self.collection).await?;

        Ok(keys
            .into_iter()
            .filter(|key| key.len() == SESSION_ID_LEN)
            .filter_map(|key| String::from_utf8(key).ok())
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
