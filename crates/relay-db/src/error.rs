//! # Database Error Types
//!
//! Error types for metadata persistence.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)      ValidationError (relay-core)          │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HookError (relay-server) ← Logged by the dispatcher                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use relay_core::ValidationError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Key not present in the collection.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Record rejected before being written.
    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),

    /// Stored bytes could not be decoded.
    ///
    /// ## When This Occurs
    /// - A value was written by something other than the repository
    /// - The record layout changed incompatibly
    #[error("Corrupt value under key '{key}': {reason}")]
    Corruption { key: String, reason: String },

    /// One or more key deletions failed during removal.
    ///
    /// Every key is attempted; the messages of all failures are kept.
    #[error("Failed to delete {} key(s): {}", failures.len(), failures.join("; "))]
    PartialDelete { failures: Vec<String> },

    /// Blob store refused to discard an upload.
    #[error("Upload store failed to remove '{id}': {reason}")]
    InvokerFailed { id: String, reason: String },

    /// Construction-time misconfiguration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Corruption error for a stored key.
    pub fn corruption(key: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Corruption {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the error means "no such record".
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
