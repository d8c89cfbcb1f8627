//! # relay-core: Pure Domain Logic for Log Relay
//!
//! This crate holds the metadata model and the rules applied to it, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Log Relay Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Upload engine (external)                         │   │
//! │  │    pre-create ──► post-create ──► post-finish ──► terminate    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ hooks / notifications                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          relay-server (dispatcher + upload service)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ relay-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────┐  ┌─────────────┐  ┌─────────────┐            │   │
//! │  │   │    types    │  │ validation  │  │  timestamp  │            │   │
//! │  │   │UploadRecord │  │   policy    │  │  UnixDate   │            │   │
//! │  │   └─────────────┘  └─────────────┘  └─────────────┘            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │           ┌────────────────────┴───────────────────┐                   │
//! │  ┌────────▼────────┐                      ┌────────▼────────┐          │
//! │  │    relay-db     │                      │   relay-sync    │          │
//! │  │ metadata store  │                      │ delivery + auth │          │
//! │  └─────────────────┘                      └─────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - `UploadRecord`, the canonical metadata record
//! - [`validation`] - Metadata policy checks
//! - [`timestamp`] - UnixDate layout parsing and formatting
//! - [`error`] - Validation error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod timestamp;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ValidationError, ValidationResult};
pub use types::{composite_key, UploadRecord};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length (bytes) of any single metadata string field.
///
/// ## Business Reason
/// One uniform bound keeps record sizes predictable in the key-value store.
pub const MAX_METADATA_FIELD_LEN: usize = 64;

/// Length of a session identifier issued by the upload engine.
///
/// Primary keys are told apart from composite-key copies by this length.
pub const SESSION_ID_LEN: usize = 32;

/// Default key-value collection holding upload metadata.
pub const DEFAULT_COLLECTION: &str = "root";
