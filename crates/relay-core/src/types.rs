//! # Domain Types
//!
//! The single canonical metadata record shared by every layer.
//!
//! ## Record Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         UploadRecord                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │    Identity     │   │  Business identity   │   │   Lifecycle     │  │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ─────────────  │  │
//! │  │  session_id     │   │  serial_number       │   │ start_timestamp │  │
//! │  │  (engine id)    │   │  + log_collection_   │   │ finish_timestamp│  │
//! │  │                 │   │    timestamp         │   │                 │  │
//! │  └─────────────────┘   └──────────────────────┘   └─────────────────┘  │
//! │                                                                         │
//! │  Descriptive: service, client_start_timestamp, system_type, log_level, │
//! │  originator, checksum, hostname, notification_manager, cancel,         │
//! │  file_name                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every stored record is reachable by:
//! - `session_id`: assigned by the upload engine, primary key
//! - `serial_number + log_collection_timestamp`: the composite uniqueness key
//!
//! The wire format is the PascalCase JSON object the clients attach to an
//! upload (`SerialNumber`, `LogCollectionTimestamp`, ...). The same encoding
//! is used for the stored copies.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// Upload Record
// =============================================================================

/// Metadata describing one uploaded log bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UploadRecord {
    /// Service that produced the logs.
    pub service: String,

    /// Serial number of the reporting system. Required.
    pub serial_number: String,

    /// When the logs were collected (UnixDate layout). Required.
    pub log_collection_timestamp: String,

    /// When the client started the upload (UnixDate layout). Required.
    pub client_start_timestamp: String,

    pub system_type: String,
    pub log_level: String,
    pub originator: String,

    /// Upload engine identifier.
    #[serde(rename = "SessionID")]
    pub session_id: String,

    pub checksum: String,
    pub hostname: String,
    pub notification_manager: String,
    pub cancel: String,

    /// Set when the business record is created.
    pub start_timestamp: String,

    /// Set when the byte transfer completes.
    pub finish_timestamp: String,

    /// Original file name reported by the upload engine.
    pub file_name: String,
}

impl UploadRecord {
    /// Parses client-supplied metadata.
    ///
    /// The metadata must be a JSON object; unknown fields are ignored and
    /// missing fields default to empty strings.
    ///
    /// ## Example
    /// ```rust
    /// use relay_core::UploadRecord;
    ///
    /// let record = UploadRecord::from_metadata(r#"{"SerialNumber":"0123456789"}"#).unwrap();
    /// assert_eq!(record.serial_number, "0123456789");
    /// assert!(UploadRecord::from_metadata("not json").is_err());
    /// ```
    pub fn from_metadata(metadata: &str) -> ValidationResult<Self> {
        let value: serde_json::Value = serde_json::from_str(metadata)?;
        if !value.is_object() {
            return Err(ValidationError::MalformedJson(
                "metadata must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Returns the composite uniqueness key (`serial_number + log_collection_timestamp`).
    pub fn composite_key(&self) -> String {
        composite_key(&self.serial_number, &self.log_collection_timestamp)
    }

    /// Read projection over every string field, paired with its wire name.
    pub fn string_fields(&self) -> [(&'static str, &str); 15] {
        [
            ("Service", self.service.as_str()),
            ("SerialNumber", self.serial_number.as_str()),
            ("LogCollectionTimestamp", self.log_collection_timestamp.as_str()),
            ("ClientStartTimestamp", self.client_start_timestamp.as_str()),
            ("SystemType", self.system_type.as_str()),
            ("LogLevel", self.log_level.as_str()),
            ("Originator", self.originator.as_str()),
            ("SessionID", self.session_id.as_str()),
            ("Checksum", self.checksum.as_str()),
            ("Hostname", self.hostname.as_str()),
            ("NotificationManager", self.notification_manager.as_str()),
            ("Cancel", self.cancel.as_str()),
            ("StartTimestamp", self.start_timestamp.as_str()),
            ("FinishTimestamp", self.finish_timestamp.as_str()),
            ("FileName", self.file_name.as_str()),
        ]
    }

    /// Write projection: copies every non-empty field of `patch` over `self`.
    ///
    /// Used by the completion path, which only carries `finish_timestamp`.
    pub fn merge_from(&mut self, patch: &UploadRecord) {
        fn assign(src: &str, dst: &mut String) {
            if !src.is_empty() {
                *dst = src.to_string();
            }
        }

        assign(&patch.service, &mut self.service);
        assign(&patch.serial_number, &mut self.serial_number);
        assign(&patch.log_collection_timestamp, &mut self.log_collection_timestamp);
        assign(&patch.client_start_timestamp, &mut self.client_start_timestamp);
        assign(&patch.system_type, &mut self.system_type);
        assign(&patch.log_level, &mut self.log_level);
        assign(&patch.originator, &mut self.originator);
        assign(&patch.session_id, &mut self.session_id);
        assign(&patch.checksum, &mut self.checksum);
        assign(&patch.hostname, &mut self.hostname);
        assign(&patch.notification_manager, &mut self.notification_manager);
        assign(&patch.cancel, &mut self.cancel);
        assign(&patch.start_timestamp, &mut self.start_timestamp);
        assign(&patch.finish_timestamp, &mut self.finish_timestamp);
        assign(&patch.file_name, &mut self.file_name);
    }
}

/// Builds the composite uniqueness key from its two parts.
pub fn composite_key(serial_number: &str, log_collection_timestamp: &str) -> String {
    format!("{}{}", serial_number, log_collection_timestamp)
}

// =============================================================================
// Tests
// =============================================================================
