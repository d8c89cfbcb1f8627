//! # Error Types
//!
//! Domain-specific error types for relay-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  relay-core errors (this file)                                         │
//! │  └── ValidationError  - Malformed or out-of-policy metadata            │
//! │                                                                         │
//! │  relay-db errors (separate crate)                                      │
//! │  └── DbError          - Key-value and repository failures              │
//! │                                                                         │
//! │  relay-sync errors (separate crate)                                    │
//! │  └── SyncError        - Auth and delivery failures                     │
//! │                                                                         │
//! │  relay-server errors (app)                                             │
//! │  └── HookError        - What the dispatcher logs per event             │
//! │                                                                         │
//! │  Flow: ValidationError → DbError / HookError → log line                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Metadata validation errors.
///
/// Raised before anything is written: a validation failure in the
/// pre-admission hook rejects the upload outright.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Metadata is not valid JSON (or not a JSON object).
    #[error("invalid json in metadata: {0}")]
    MalformedJson(String),

    /// A required field is missing or empty.
    #[error("{field} may not be empty")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} exceeds the maximum metadata length of {max}")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g. a timestamp outside the UnixDate layout).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a `Required` error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::MalformedJson(err.to_string())
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("SerialNumber");
        assert_eq!(err.to_string(), "SerialNumber may not be empty");

        let err = ValidationError::TooLong {
            field: "Hostname".to_string(),
            max: 64,
        };
        assert_eq!(
            err.to_string(),
            "Hostname exceeds the maximum metadata length of 64"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: ValidationError = json_err.into();
        assert!(matches!(err, ValidationError::MalformedJson(_)));
    }
}
