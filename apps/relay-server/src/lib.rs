//! # Log Relay Server
//!
//! Receives the upload engine's lifecycle hooks, keeps upload metadata, and
//! relays finished uploads to the ingestion service.
//!
//! ## Task Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Relay Process                                  │
//! │                                                                         │
//! │  upload engine ──HTTP hooks──► hook receiver (axum)                    │
//! │                                     │ pre-create: UploadService        │
//! │                                     │ post-*: engine channels          │
//! │                                     ▼                                   │
//! │                              HookDispatcher task ◄──── signals ──┐     │
//! │                                     │                            │     │
//! │                                     ▼                            │     │
//! │                              UploadService                       │     │
//! │                               │          │                       │     │
//! │                               ▼          ▼                       │     │
//! │                   MetadataRepository   OutboxHandle              │     │
//! │                   (SQLite kv_entries)      │                     │     │
//! │                                            ▼                     │     │
//! │                                     OutboxProcessor task ────────┘     │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                                   ingestion service                     │
//! │                                                                         │
//! │  One CancellationToken stops both tasks; the supervisor waits for      │
//! │  them up to the grace period, then aborts what is left.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod hook_http;
pub mod invoker;
pub mod service;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use relay_db::{Database, DbConfig, MetadataRepository};
use relay_sync::{AuthProvider, MultipartTransport, OutboxProcessor};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use config::{ConfigError, RelayConfig};
pub use dispatcher::HookDispatcher;
pub use engine::{EngineNotifications, EngineNotifiers, HookKind, PreCreateHook, UploadInfo};
pub use error::{HookError, HookResult, StartupError};
pub use invoker::FileStoreInvoker;
pub use service::UploadService;

// =============================================================================
// Tracing
// =============================================================================

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relay=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// =============================================================================
// Assembly
// =============================================================================

/// Every component wired together, before any task runs.
pub struct RelayApp {
    database: Database,
    service: Arc<UploadService>,
    notifiers: EngineNotifiers,
    notifications: EngineNotifications,
    processor: OutboxProcessor,
    signals: mpsc::Receiver<String>,
    grace_period: Duration,
}

impl RelayApp {
    /// Opens the store and builds the auth, delivery and hook layers.
    ///
    /// Nothing is spawned; every construction error is fatal.
    pub async fn build(config: &RelayConfig) -> Result<Self, StartupError> {
        config.validate()?;

        let database = Database::new(DbConfig::new(config.store.db_path.clone())).await?;
        let invoker = Arc::new(FileStoreInvoker::new(
            &config.delivery.upload_dir,
            &config.delivery.file_ext,
        ));
        let repository = Arc::new(MetadataRepository::new(
            Arc::new(database.kv_store()),
            invoker,
            &config.store.collection,
        )?);

        let auth = Arc::new(AuthProvider::new(config.auth.clone())?);
        let transport = Arc::new(MultipartTransport::new(auth.http_client().clone()));
        let (processor, outbox, signals) =
            OutboxProcessor::new(config.delivery.clone(), auth, transport)?;

        let service = Arc::new(UploadService::new(repository, outbox));
        let (notifiers, notifications) =
            engine::notification_channels(config.server.notification_capacity);

        Ok(RelayApp {
            database,
            service,
            notifiers,
            notifications,
            processor,
            signals,
            grace_period: config.server.grace_period(),
        })
    }

    pub fn service(&self) -> Arc<UploadService> {
        self.service.clone()
    }

    /// Logs every upload still stored from a previous run.
    ///
    /// Such uploads were created but never delivered; they stay until the
    /// engine reports them again or an operator removes them.
    pub async fn reconcile(&self) -> Result<Vec<String>, HookError> {
        let pending = self.service.list_sessions().await?;
        if pending.is_empty() {
            info!("No uploads pending from a previous run");
        } else {
            for session_id in &pending {
                warn!(session_id = %session_id, "Upload pending from a previous run");
            }
            info!(count = pending.len(), "Pending uploads found");
        }
        Ok(pending)
    }

    /// Spawns the dispatcher and the delivery worker and returns the hook router.
    pub fn start(self, cancel: CancellationToken) -> RunningRelay {
        let dispatcher = HookDispatcher::new(self.service.clone());
        let tasks = vec![
            tokio::spawn(self.processor.run(cancel.clone())),
            tokio::spawn(dispatcher.run(self.notifications, self.signals, cancel.clone())),
        ];

        let router = hook_http::router(hook_http::HookState::new(
            self.service.clone(),
            self.notifiers,
        ));

        RunningRelay {
            database: self.database,
            service: self.service,
            router,
            tasks,
            cancel,
            grace_period: self.grace_period,
        }
    }
}

/// Handle on the spawned tasks.
pub struct RunningRelay {
    database: Database,
    service: Arc<UploadService>,
    router: Router,
    tasks: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
    grace_period: Duration,
}

impl RunningRelay {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn service(&self) -> Arc<UploadService> {
        self.service.clone()
    }

    /// Cancels the tasks, waits up to the grace period, then aborts the rest.
    pub async fn shutdown(self) {
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + self.grace_period;
        for mut task in self.tasks {
            if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
                warn!("Task did not stop within the grace period, aborting");
                task.abort();
            }
        }

        self.database.close().await;
        info!("Relay stopped");
    }
}

// =============================================================================
// Process Entry
// =============================================================================

/// Runs the relay until `shutdown` resolves.
pub async fn run(
    config: RelayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), StartupError> {
    let app = RelayApp::build(&config).await?;
    if let Err(e) = app.reconcile().await {
        warn!(error = %e, "Could not list pending uploads");
    }

    let listener = TcpListener::bind(&config.server.bind_addr).await?;
    info!(addr = %config.server.bind_addr, "Hook receiver listening");

    let relay = app.start(CancellationToken::new());
    let cancel = relay.cancel.clone();

    let served = axum::serve(listener, relay.router())
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown => info!("Shutdown requested"),
                _ = cancel.cancelled() => {}
            }
        })
        .await;

    relay.shutdown().await;
    served?;
    Ok(())
}
