//! # Upload Store Invoker
//!
//! Capability for discarding an upload's stored bytes once its metadata is
//! gone. The repository calls it as the last step of `remove`.

use async_trait::async_trait;

use crate::error::DbResult;

/// Irreversibly discards the blob of an upload.
///
/// Implementations must treat an already-removed id as success.
#[async_trait]
pub trait UploadStoreInvoker: Send + Sync {
    async fn remove(&self, session_id: &str) -> DbResult<()>;
}
