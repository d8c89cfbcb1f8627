//! # Server Error Types
//!
//! What the dispatcher logs per event, and what stops the process at startup.
//!
//! ## Error Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Per-Event Error Mapping                             │
//! │                                                                         │
//! │  ValidationError ──────────────────────────► HookError::Validation     │
//! │  DbError::NotFound ────────────────────────► HookError::NotFound       │
//! │  DbError::Validation ──────────────────────► HookError::Validation     │
//! │  DbError::* (everything else) ─────────────► HookError::Storage        │
//! │  SyncError (rejected input) ───────────────► HookError::Undeliverable  │
//! │  SyncError::* (everything else) ───────────► HookError::Delivery       │
//! │                                                                         │
//! │  None of these stop a loop: the dispatcher logs and drops the event.   │
//! │  StartupError is the only fatal kind; it ends `main` before any task   │
//! │  is spawned.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use relay_core::ValidationError;
use relay_db::DbError;
use relay_sync::SyncError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for hook handling.
pub type HookResult<T> = Result<T, HookError>;

/// Outcome of a failed lifecycle event.
#[derive(Debug, Error)]
pub enum HookError {
    /// Metadata is malformed or out of policy.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Another upload already carries this serial number and collection time.
    #[error("upload with key '{key}' already exists")]
    Duplicate { key: String },

    /// No stored record for the upload.
    #[error("upload not found: {id}")]
    NotFound { id: String },

    /// Metadata repository failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The stored upload can't be delivered as it stands (blob missing,
    /// no file name, unusable session id).
    #[error("upload can't be delivered: {0}")]
    Undeliverable(String),

    /// Could not hand the upload to the delivery queue.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Engine notification channel is closed.
    #[error("notification channel closed: {0}")]
    Channel(String),
}

impl HookError {
    /// True for errors caused by the client's metadata rather than the server.
    pub fn is_rejection(&self) -> bool {
        matches!(self, HookError::Validation(_) | HookError::Duplicate { .. })
    }
}

impl From<DbError> for HookError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { id, .. } => HookError::NotFound { id },
            DbError::Validation(e) => HookError::Validation(e),
            other => HookError::Storage(other.to_string()),
        }
    }
}

impl From<SyncError> for HookError {
    fn from(err: SyncError) -> Self {
        if err.is_rejected_input() {
            HookError::Undeliverable(err.to_string())
        } else {
            HookError::Delivery(err.to_string())
        }
    }
}

// =============================================================================
// Startup Errors
// =============================================================================

/// Fatal errors raised while assembling the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("metadata store: {0}")]
    Database(#[from] DbError),

    #[error("delivery: {0}")]
    Delivery(#[from] SyncError),

    #[error("hook listener: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_by_kind() {
        let err: HookError = DbError::not_found("upload", "abc").into();
        assert!(matches!(err, HookError::NotFound { ref id } if id == "abc"));

        let err: HookError = DbError::Validation(ValidationError::required("SessionID")).into();
        assert!(err.is_rejection());

        let err: HookError = DbError::PartialDelete {
            failures: vec!["disk full".into()],
        }
        .into();
        assert!(matches!(err, HookError::Storage(_)));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_sync_errors_split_by_cause() {
        let err: HookError = SyncError::EmptyFileName {
            session_id: "abc".into(),
        }
        .into();
        assert!(matches!(err, HookError::Undeliverable(ref msg) if msg.contains("abc")));

        let err: HookError = SyncError::ShuttingDown.into();
        assert!(matches!(err, HookError::Delivery(_)));
        assert!(!err.is_rejection());
    }
}
