//! # Sync Error Types
//!
//! Error types for authentication and delivery.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Delivery Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │  Enqueue-time   │  │     Worker-time         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  InvalidSession │  │  AuthFailed             │ │
//! │  │  InvalidUrl     │  │  SourceMissing  │  │  Transport              │ │
//! │  │                 │  │  EmptyFileName  │  │  UnexpectedStatus       │ │
//! │  │                 │  │  ShuttingDown   │  │                         │ │
//! │  │                 │  │                 │  │  QueueFull / SignalFull │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Enqueue-time errors go back to the caller. Worker-time errors are     │
//! │  logged by the worker and the item is dropped.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by the auth provider and the delivery queue.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid delivery or auth configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Base or destination URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// Login failed or the downstream service kept rejecting the credential.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    // =========================================================================
    // Enqueue Errors
    // =========================================================================
    /// Session id would resolve outside the upload directory.
    #[error("Invalid session id: '{session_id}'")]
    InvalidSessionId { session_id: String },

    /// Source blob is not on disk.
    #[error("Source file not found: {path}")]
    SourceMissing { path: String },

    /// Upload has no file name to deliver under.
    #[error("File name is empty for upload {session_id}")]
    EmptyFileName { session_id: String },

    // =========================================================================
    // Delivery Errors
    // =========================================================================
    /// Request could not be sent or the body could not be streamed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Downstream answered with something other than 201 or 401.
    #[error("Delivery of {session_id} failed with HTTP {status}")]
    UnexpectedStatus { session_id: String, status: u16 },

    /// Re-queue after a 401 found the delivery queue full.
    #[error("Delivery queue full, dropped {session_id}")]
    QueueFull { session_id: String },

    /// Completion signal could not be posted; the blob is not deleted.
    #[error("Completion signal queue full, {session_id} isn't deleted")]
    SignalQueueFull { session_id: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Queue receiver is gone.
    #[error("Delivery queue is shutting down")]
    ShuttingDown,

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if a later attempt could succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_) | SyncError::QueueFull { .. } | SyncError::SignalQueueFull { .. }
        )
    }

    /// Returns true if the caller handed in an upload that can't be delivered.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidSessionId { .. }
                | SyncError::SourceMissing { .. }
                | SyncError::EmptyFileName { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(SyncError::Transport("reset".into()).is_retryable());
        assert!(!SyncError::AuthFailed("bad token".into()).is_retryable());

        assert!(SyncError::SourceMissing {
            path: "/tmp/x".into()
        }
        .is_rejected_input());
        assert!(SyncError::InvalidSessionId {
            session_id: "../x".into()
        }
        .is_rejected_input());
        assert!(!SyncError::InvalidUrl("nope".into()).is_rejected_input());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::UnexpectedStatus {
            session_id: "abc".into(),
            status: 500,
        };
        assert_eq!(err.to_string(), "Delivery of abc failed with HTTP 500");
    }
}
