//! # Upload Engine Contract
//!
//! The resumable-upload engine is an external collaborator. It reports each
//! upload's lifecycle through four notification channels and lets the relay
//! veto new uploads through a synchronous pre-create interceptor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine → Relay Contract                            │
//! │                                                                         │
//! │  begin-upload ──► PreCreateHook::pre_create(info)   (sync, may veto)   │
//! │                                                                         │
//! │  EngineNotifiers                         EngineNotifications            │
//! │  ┌──────────────┐   created     ┌──────────────────────────────┐       │
//! │  │  producer    │──────────────►│                              │       │
//! │  │  (hook HTTP  │   progress    │                              │       │
//! │  │   receiver)  │──────────────►│  consumed by HookDispatcher  │       │
//! │  │              │   finished    │                              │       │
//! │  │              │──────────────►│                              │       │
//! │  │              │   terminated  │                              │       │
//! │  │              │──────────────►│                              │       │
//! │  └──────────────┘               └──────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{HookError, HookResult};

/// Metadata key carrying the JSON business metadata.
pub const METADATA_DATA_KEY: &str = "data";

/// Metadata key carrying the client's file name.
pub const METADATA_FILENAME_KEY: &str = "filename";

// =============================================================================
// Upload Info
// =============================================================================

/// An upload as the engine describes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadInfo {
    /// Engine-assigned id; empty before the upload is admitted.
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Size")]
    pub size: i64,

    #[serde(rename = "Offset")]
    pub offset: i64,

    #[serde(rename = "MetaData")]
    pub metadata: HashMap<String, String>,
}

impl UploadInfo {
    /// Value of a metadata key, empty when absent.
    pub fn meta(&self, key: &str) -> &str {
        self.metadata.get(key).map(String::as_str).unwrap_or("")
    }
}

// =============================================================================
// Hook Kinds
// =============================================================================

/// Every lifecycle event the relay reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    PreCreate,
    PostCreate,
    PostReceive,
    PostFinish,
    PostTerminate,
    /// Raised by the delivery worker, not by the engine.
    DeliveryComplete,
}

impl HookKind {
    /// Wire name as sent in the `Hook-Name` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::PreCreate => "pre-create",
            HookKind::PostCreate => "post-create",
            HookKind::PostReceive => "post-receive",
            HookKind::PostFinish => "post-finish",
            HookKind::PostTerminate => "post-terminate",
            HookKind::DeliveryComplete => "delivery-complete",
        }
    }

    /// Parses an engine hook name. `delivery-complete` is internal and never parsed.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pre-create" => Some(HookKind::PreCreate),
            "post-create" => Some(HookKind::PostCreate),
            "post-receive" => Some(HookKind::PostReceive),
            "post-finish" => Some(HookKind::PostFinish),
            "post-terminate" => Some(HookKind::PostTerminate),
            _ => None,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Notification Channels
// =============================================================================

/// Producer side of the four engine notification channels.
#[derive(Clone)]
pub struct EngineNotifiers {
    created: mpsc::Sender<UploadInfo>,
    progress: mpsc::Sender<UploadInfo>,
    finished: mpsc::Sender<UploadInfo>,
    terminated: mpsc::Sender<UploadInfo>,
}

/// Consumer side, owned by the dispatcher.
pub struct EngineNotifications {
    pub created: mpsc::Receiver<UploadInfo>,
    pub progress: mpsc::Receiver<UploadInfo>,
    pub finished: mpsc::Receiver<UploadInfo>,
    pub terminated: mpsc::Receiver<UploadInfo>,
}

/// Creates the four channels with the given capacity each.
pub fn notification_channels(capacity: usize) -> (EngineNotifiers, EngineNotifications) {
    let (created_tx, created_rx) = mpsc::channel(capacity);
    let (progress_tx, progress_rx) = mpsc::channel(capacity);
    let (finished_tx, finished_rx) = mpsc::channel(capacity);
    let (terminated_tx, terminated_rx) = mpsc::channel(capacity);

    (
        EngineNotifiers {
            created: created_tx,
            progress: progress_tx,
            finished: finished_tx,
            terminated: terminated_tx,
        },
        EngineNotifications {
            created: created_rx,
            progress: progress_rx,
            finished: finished_rx,
            terminated: terminated_rx,
        },
    )
}

impl EngineNotifiers {
    /// Publishes a post-* event. Waits while the channel is full.
    pub async fn notify(&self, kind: HookKind, info: UploadInfo) -> HookResult<()> {
        let channel = match kind {
            HookKind::PostCreate => &self.created,
            HookKind::PostReceive => &self.progress,
            HookKind::PostFinish => &self.finished,
            HookKind::PostTerminate => &self.terminated,
            HookKind::PreCreate | HookKind::DeliveryComplete => {
                return Err(HookError::Channel(format!("{} has no channel", kind)));
            }
        };

        channel
            .send(info)
            .await
            .map_err(|_| HookError::Channel(kind.to_string()))
    }
}

// =============================================================================
// Pre-Create Interceptor
// =============================================================================

/// Synchronous veto on the engine's begin-upload path.
#[async_trait]
pub trait PreCreateHook: Send + Sync {
    /// Returning an error rejects the upload before any byte is accepted.
    async fn pre_create(&self, info: &UploadInfo) -> HookResult<()>;
}
