//! # relay-sync: Outbound Delivery for Log Relay
//!
//! This crate relays finished uploads to the downstream ingestion service
//! under a bearer credential that can expire at any time.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Delivery Architecture                            │
//! │                                                                         │
//! │  UploadService::complete                                               │
//! │       │ OutboxHandle::enqueue                                          │
//! │       ▼                                                                 │
//! │  ┌────────────────────────────────────────────────────────────────┐    │
//! │  │                    OutboxProcessor (one task)                  │    │
//! │  └───────┬───────────────────────────┬──────────────────────┬─────┘    │
//! │          │                           │                      │          │
//! │          ▼                           ▼                      ▼          │
//! │  ┌────────────────┐        ┌──────────────────┐   ┌────────────────┐   │
//! │  │  AuthProvider  │        │MultipartTransport│   │ signal channel │   │
//! │  │                │        │                  │   │  (capacity 1)  │   │
//! │  │ login → token  │        │ POST <base>/<sn> │   │ → dispatcher   │   │
//! │  └────────────────┘        └──────────────────┘   └────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Delivery and auth settings
//! - [`auth`] - `Authorizer` capability and `AuthProvider`
//! - [`transport`] - `UploadTransport` capability and `MultipartTransport`
//! - [`outbox`] - Delivery queue, worker and completion signals
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_sync::{AuthProvider, MultipartTransport, OutboxProcessor};
//!
//! let auth = Arc::new(AuthProvider::new(config.auth)?);
//! let transport = Arc::new(MultipartTransport::new(auth.http_client().clone()));
//! let (processor, outbox, signals) = OutboxProcessor::new(config.delivery, auth, transport)?;
//! tokio::spawn(processor.run(cancel.clone()));
//!
//! outbox.enqueue(&session_id, "bundle.tar", "0123456789").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod config;
pub mod error;
pub mod outbox;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{AuthProvider, Authorizer};
pub use config::{AuthConfig, DeliveryConfig};
pub use error::{SyncError, SyncResult};
pub use outbox::{OutboxHandle, OutboxProcessor, PendingDelivery, MAX_AUTH_RETRIES};
pub use transport::{MultipartTransport, UploadTransport};
