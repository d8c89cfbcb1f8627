//! # Outbox Processor
//!
//! Bounded delivery queue with a single worker that hands finished uploads to
//! the ingestion service.
//!
//! ## Delivery Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Processor Flow                                │
//! │                                                                         │
//! │  OutboxHandle::enqueue(session_id, file_name, serial)                  │
//! │       │  resolve <base_url>/<serial>                                   │
//! │       │  check <upload_dir>/<session_id><file_ext> exists              │
//! │       │  snapshot the current token                                    │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          delivery queue (mpsc, capacity 10, FIFO)               │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 OutboxProcessor::run (one task)                 │   │
//! │  │                                                                 │   │
//! │  │  1. empty token?  → authorize(), keep token on the item        │   │
//! │  │  2. transport.upload(item)                                      │   │
//! │  │  3. 401 → authorize(), back of the queue (once per item)       │   │
//! │  │     201 → try_send(session_id) on the signal channel (cap 1)   │   │
//! │  │     ... → error logged, item dropped                           │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  completion signals ──► dispatcher ──► terminate(session_id)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items are never retried in place. Producers wait while the queue is full;
//! the worker itself never waits on its own queue.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::auth::Authorizer;
use crate::config::DeliveryConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::UploadTransport;

// =============================================================================
// Constants
// =============================================================================

/// Capacity of the completion signal channel.
pub const SIGNAL_CAPACITY: usize = 1;

/// Re-queues allowed per item after a 401.
pub const MAX_AUTH_RETRIES: u32 = 1;

// =============================================================================
// Pending Delivery
// =============================================================================

/// One upload waiting for (or in) delivery.
#[derive(Debug, Clone)]
pub struct PendingDelivery {
    pub session_id: String,

    /// `Authorization` header value; empty means "log in first".
    pub token: String,

    /// File name presented to the ingestion service.
    pub file_name: String,

    /// Fully resolved destination URL.
    pub url: Url,

    /// Blob on disk.
    pub file_path: PathBuf,

    pub field_form: String,

    /// How many times this item went back to the queue after a 401.
    pub auth_retries: u32,
}

// =============================================================================
// Handle
// =============================================================================

/// Producer side of the delivery queue.
#[derive(Clone)]
pub struct OutboxHandle {
    config: Arc<DeliveryConfig>,
    base_url: Url,
    queue_tx: mpsc::Sender<PendingDelivery>,
    auth: Arc<dyn Authorizer>,
}

impl OutboxHandle {
    /// Queues a finished upload for delivery to `<base_url>/<destination>`.
    ///
    /// Waits while the queue is full.
    ///
    /// ## Errors
    /// - `InvalidUrl` if the destination can't be joined onto the base URL
    /// - `InvalidSessionId` if the session id is empty or path-like
    /// - `SourceMissing` if the blob is not on disk
    /// - `EmptyFileName` if `file_name` is empty
    /// - `ShuttingDown` if the worker is gone
    pub async fn enqueue(
        &self,
        session_id: &str,
        file_name: &str,
        destination: &str,
    ) -> SyncResult<()> {
        let url = self.destination_url(destination)?;

        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id.contains("..")
        {
            return Err(SyncError::InvalidSessionId {
                session_id: session_id.to_string(),
            });
        }
        let file_path = self.source_path(session_id);
        if !tokio::fs::try_exists(&file_path).await.unwrap_or(false) {
            return Err(SyncError::SourceMissing {
                path: file_path.display().to_string(),
            });
        }
        if file_name.is_empty() {
            return Err(SyncError::EmptyFileName {
                session_id: session_id.to_string(),
            });
        }

        let item = PendingDelivery {
            session_id: session_id.to_string(),
            token: self.auth.current_token().await,
            file_name: file_name.to_string(),
            url,
            file_path,
            field_form: self.config.field_form.clone(),
            auth_retries: 0,
        };

        debug!(session_id = %session_id, url = %item.url, "Queuing delivery");

        self.queue_tx
            .send(item)
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }

    /// Appends `destination` as one path segment of the base URL.
    pub fn destination_url(&self, destination: &str) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(destination);
        Ok(url)
    }

    /// `<upload_dir>/<session_id><file_ext>`
    pub fn source_path(&self, session_id: &str) -> PathBuf {
        self.config
            .upload_dir
            .join(format!("{}{}", session_id, self.config.file_ext))
    }
}

// =============================================================================
// Outbox Processor
// =============================================================================

/// The single delivery worker.
pub struct OutboxProcessor {
    queue_rx: mpsc::Receiver<PendingDelivery>,

    /// Used only for 401 re-queues.
    queue_tx: mpsc::Sender<PendingDelivery>,

    signal_tx: mpsc::Sender<String>,
    auth: Arc<dyn Authorizer>,
    transport: Arc<dyn UploadTransport>,
}

impl OutboxProcessor {
    /// Creates the worker, its producer handle and the completion signal
    /// receiver (session ids of delivered uploads).
    ///
    /// ## Errors
    /// `InvalidConfig` / `InvalidUrl` if the delivery config is unusable.
    pub fn new(
        config: DeliveryConfig,
        auth: Arc<dyn Authorizer>,
        transport: Arc<dyn UploadTransport>,
    ) -> SyncResult<(Self, OutboxHandle, mpsc::Receiver<String>)> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)?;

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_CAPACITY);

        let handle = OutboxHandle {
            config: Arc::new(config),
            base_url,
            queue_tx: queue_tx.clone(),
            auth: auth.clone(),
        };

        let processor = OutboxProcessor {
            queue_rx,
            queue_tx,
            signal_tx,
            auth,
            transport,
        };

        Ok((processor, handle, signal_rx))
    }

    /// Runs the worker until `cancel` fires. Queued items are not drained.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Outbox processor starting");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Outbox processor shutting down");
                    break;
                }

                item = self.queue_rx.recv() => {
                    let Some(item) = item else { break };
                    let session_id = item.session_id.clone();
                    if let Err(e) = self.deliver(item).await {
                        error!(?e, session_id = %session_id, retryable = e.is_retryable(), "Delivery failed");
                    }
                }
            }
        }

        info!("Outbox processor stopped");
    }

    /// Processes one item.
    async fn deliver(&self, mut item: PendingDelivery) -> SyncResult<()> {
        if item.token.is_empty() {
            item.token = self.auth.authorize().await?;
        }

        let status = self.transport.upload(&item).await?;

        match status {
            StatusCode::UNAUTHORIZED => self.requeue_unauthorized(item).await,
            StatusCode::CREATED => {
                info!(session_id = %item.session_id, "Delivered");
                self.signal_tx
                    .try_send(item.session_id)
                    .map_err(|e| match e {
                        TrySendError::Full(session_id) => SyncError::SignalQueueFull { session_id },
                        TrySendError::Closed(_) => {
                            SyncError::ChannelError("Signal channel closed".into())
                        }
                    })
            }
            other => Err(SyncError::UnexpectedStatus {
                session_id: item.session_id,
                status: other.as_u16(),
            }),
        }
    }

    async fn requeue_unauthorized(&self, mut item: PendingDelivery) -> SyncResult<()> {
        if item.auth_retries >= MAX_AUTH_RETRIES {
            return Err(SyncError::AuthFailed(format!(
                "{} still unauthorized after {} re-authorization(s)",
                item.session_id, item.auth_retries
            )));
        }

        warn!(session_id = %item.session_id, "Credential rejected, re-authorizing");
        item.token = self.auth.authorize().await?;
        item.auth_retries += 1;

        self.queue_tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(item) => SyncError::QueueFull {
                session_id: item.session_id,
            },
            TrySendError::Closed(_) => SyncError::ShuttingDown,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
