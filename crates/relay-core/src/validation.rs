//! # Validation Module
//!
//! Metadata policy checks for Log Relay.
//!
//! ## Validation Stages
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Stages                                  │
//! │                                                                         │
//! │  Stage 1: pre-create hook (before any bytes are accepted)              │
//! │  ├── JSON shape (UploadRecord::from_metadata)                          │
//! │  └── THIS MODULE: validate_metadata                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Stage 2: uniqueness lookup (composite key, in relay-server)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Stage 3: post-create hook                                             │
//! │  └── THIS MODULE: validate_for_storage                                 │
//! │                                                                         │
//! │  A failure in stage 1 or 2 rejects the upload at the engine.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::timestamp::parse_unix_date;
use crate::types::UploadRecord;
use crate::MAX_METADATA_FIELD_LEN;

/// Validates client metadata before an upload is admitted.
///
/// ## Rules
/// - `SerialNumber` must not be empty
/// - `LogCollectionTimestamp` and `ClientStartTimestamp` must use the
///   UnixDate layout
/// - Every string field is at most [`MAX_METADATA_FIELD_LEN`] bytes
///
/// ## Example
/// ```rust
/// use relay_core::{validation::validate_metadata, UploadRecord};
///
/// let record = UploadRecord {
///     serial_number: "0123456789".into(),
///     log_collection_timestamp: "Mon Jan  2 15:04:05 MST 2006".into(),
///     client_start_timestamp: "Mon Jan  2 15:04:05 MST 2006".into(),
///     ..Default::default()
/// };
/// assert!(validate_metadata(&record).is_ok());
/// assert!(validate_metadata(&UploadRecord::default()).is_err());
/// ```
pub fn validate_metadata(record: &UploadRecord) -> ValidationResult<()> {
    if record.serial_number.is_empty() {
        return Err(ValidationError::required("SerialNumber"));
    }

    validate_timestamp("LogCollectionTimestamp", &record.log_collection_timestamp)?;
    validate_timestamp("ClientStartTimestamp", &record.client_start_timestamp)?;

    for (field, value) in record.string_fields() {
        if value.len() > MAX_METADATA_FIELD_LEN {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max: MAX_METADATA_FIELD_LEN,
            });
        }
    }

    Ok(())
}

/// Validates a record about to be persisted for the first time.
///
/// ## Rules
/// - `SessionID`, `SerialNumber` and `FileName` must not be empty
pub fn validate_for_storage(record: &UploadRecord) -> ValidationResult<()> {
    if record.session_id.is_empty() {
        return Err(ValidationError::required("SessionID"));
    }
    if record.serial_number.is_empty() {
        return Err(ValidationError::required("SerialNumber"));
    }
    if record.file_name.is_empty() {
        return Err(ValidationError::required("FileName"));
    }
    Ok(())
}

fn validate_timestamp(field: &str, value: &str) -> ValidationResult<()> {
    parse_unix_date(value)
        .map(|_| ())
        .map_err(|reason| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason,
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
