//! # Hook Dispatcher
//!
//! One loop that turns engine notifications and delivery signals into
//! `UploadService` calls.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dispatcher Loop                                  │
//! │                                                                         │
//! │  cancel ──────────► return                                             │
//! │  created ─────────► create(id, data, filename)                         │
//! │  progress ────────► progress(id)                                       │
//! │  finished ────────► complete(id)                                       │
//! │  terminated ──────► terminate(id)                                      │
//! │  delivery signal ─► terminate(id)                                      │
//! │                                                                         │
//! │  Branches are polled in the order above, cancel first. A create that   │
//! │  arrives together with its finish is always stored first.              │
//! │                                                                         │
//! │  Errors are logged with the hook name and session id, then dropped.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{EngineNotifications, HookKind, UploadInfo, METADATA_DATA_KEY, METADATA_FILENAME_KEY};
use crate::error::HookResult;
use crate::service::UploadService;

/// Routes lifecycle events to the upload service.
pub struct HookDispatcher {
    service: Arc<UploadService>,
}

impl HookDispatcher {
    pub fn new(service: Arc<UploadService>) -> Self {
        HookDispatcher { service }
    }

    /// Runs until `cancel` fires.
    ///
    /// A closed channel stops being polled; the loop itself only ends on
    /// cancellation.
    pub async fn run(
        self,
        mut notifications: EngineNotifications,
        mut signals: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) {
        info!("Hook dispatcher starting");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Hook dispatcher shutting down");
                    break;
                }

                Some(info) = notifications.created.recv() => {
                    self.dispatch(HookKind::PostCreate, &info).await;
                }

                Some(info) = notifications.progress.recv() => {
                    self.dispatch(HookKind::PostReceive, &info).await;
                }

                Some(info) = notifications.finished.recv() => {
                    self.dispatch(HookKind::PostFinish, &info).await;
                }

                Some(info) = notifications.terminated.recv() => {
                    self.dispatch(HookKind::PostTerminate, &info).await;
                }

                Some(session_id) = signals.recv() => {
                    let info = UploadInfo {
                        id: session_id,
                        ..Default::default()
                    };
                    self.dispatch(HookKind::DeliveryComplete, &info).await;
                }
            }
        }

        info!("Hook dispatcher stopped");
    }

    async fn dispatch(&self, kind: HookKind, info: &UploadInfo) {
        debug!(hook = %kind, session_id = %info.id, "Handling hook");

        if let Err(e) = self.handle(kind, info).await {
            warn!(hook = %kind, session_id = %info.id, error = %e, "Hook failed");
        }
    }

    async fn handle(&self, kind: HookKind, info: &UploadInfo) -> HookResult<()> {
        match kind {
            HookKind::PreCreate => {
                self.service
                    .validate(&info.id, info.meta(METADATA_DATA_KEY))
                    .await
            }
            HookKind::PostCreate => {
                self.service
                    .create(
                        &info.id,
                        info.meta(METADATA_DATA_KEY),
                        info.meta(METADATA_FILENAME_KEY),
                    )
                    .await
            }
            HookKind::PostReceive => self.service.progress(&info.id).await,
            HookKind::PostFinish => self.service.complete(&info.id).await,
            HookKind::PostTerminate | HookKind::DeliveryComplete => {
                self.service.terminate(&info.id).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::notification_channels;
    use async_trait::async_trait;
    use relay_db::{DbResult, MemoryKvStore, MetadataRepository, UploadStoreInvoker};
    use relay_sync::{
        Authorizer, DeliveryConfig, OutboxProcessor, PendingDelivery, SyncResult, UploadTransport,
    };
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    const SESSION: &str = "0123456789abcdef0123456789abcdef";
    const METADATA: &str = r#"{
        "SerialNumber": "0123456789",
        "LogCollectionTimestamp": "Mon Jan  2 15:04:05 MST 2006",
        "ClientStartTimestamp": "Mon Jan  2 15:04:05 MST 2006"
    }"#;

    #[derive(Default)]
    struct RecordingInvoker {
        removed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UploadStoreInvoker for RecordingInvoker {
        async fn remove(&self, session_id: &str) -> DbResult<()> {
            self.removed.lock().unwrap().push(session_id.to_string());
            Ok(())
        }
    }

    struct StaticAuth;

    #[async_trait]
    impl Authorizer for StaticAuth {
        async fn authorize(&self) -> SyncResult<String> {
            Ok("Bearer t".to_string())
        }

        async fn current_token(&self) -> String {
            "Bearer t".to_string()
        }
    }

    struct AlwaysCreated;

    #[async_trait]
    impl UploadTransport for AlwaysCreated {
        async fn upload(&self, _item: &PendingDelivery) -> SyncResult<StatusCode> {
            Ok(StatusCode::CREATED)
        }
    }

    fn created(id: &str) -> UploadInfo {
        let mut metadata = HashMap::new();
        metadata.insert(METADATA_DATA_KEY.to_string(), METADATA.to_string());
        metadata.insert(METADATA_FILENAME_KEY.to_string(), "world".to_string());
        UploadInfo {
            id: id.to_string(),
            size: 12,
            offset: 0,
            metadata,
        }
    }

    struct Relay {
        invoker: Arc<RecordingInvoker>,
        service: Arc<UploadService>,
        processor: OutboxProcessor,
        signals: mpsc::Receiver<String>,
    }

    fn relay(upload_dir: &Path) -> Relay {
        let invoker = Arc::new(RecordingInvoker::default());
        let repository = Arc::new(
            MetadataRepository::new(Arc::new(MemoryKvStore::new()), invoker.clone(), "root")
                .unwrap(),
        );
        let config = DeliveryConfig {
            base_url: "http://ingest.local/api/logs".into(),
            upload_dir: upload_dir.to_path_buf(),
            ..Default::default()
        };
        let (processor, outbox, signals) =
            OutboxProcessor::new(config, Arc::new(StaticAuth), Arc::new(AlwaysCreated)).unwrap();

        Relay {
            invoker,
            service: Arc::new(UploadService::new(repository, outbox)),
            processor,
            signals,
        }
    }

    async fn wait_for(service: &UploadService, id: &str, stored: bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while service.read(id).await.is_ok() != stored {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_lifecycle_through_channels() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION), b"hello world!").unwrap();
        let Relay {
            invoker,
            service,
            processor,
            signals,
        } = relay(dir.path());
        let (notifiers, notifications) = notification_channels(4);

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(processor.run(cancel.clone()));
        let dispatcher = tokio::spawn(HookDispatcher::new(service.clone()).run(
            notifications,
            signals,
            cancel.clone(),
        ));

        notifiers.notify(HookKind::PostCreate, created(SESSION)).await.unwrap();
        wait_for(&service, SESSION, true).await;
        notifiers
            .notify(HookKind::PostReceive, created(SESSION))
            .await
            .unwrap();
        notifiers
            .notify(HookKind::PostFinish, created(SESSION))
            .await
            .unwrap();

        // Delivery signal comes back through the dispatcher as a terminate
        wait_for(&service, SESSION, false).await;
        assert_eq!(*invoker.removed.lock().unwrap(), vec![SESSION.to_string()]);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), dispatcher)
            .await
            .unwrap()
            .unwrap();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_create_is_handled_before_a_queued_finish() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION), b"hello world!").unwrap();
        let Relay {
            invoker,
            service,
            processor,
            signals,
        } = relay(dir.path());
        let (notifiers, notifications) = notification_channels(4);

        // Both events are waiting before the dispatcher polls anything
        notifiers
            .notify(HookKind::PostFinish, created(SESSION))
            .await
            .unwrap();
        notifiers.notify(HookKind::PostCreate, created(SESSION)).await.unwrap();

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(processor.run(cancel.clone()));
        let dispatcher = tokio::spawn(HookDispatcher::new(service.clone()).run(
            notifications,
            signals,
            cancel.clone(),
        ));

        // Delivered and removed, so the finish found a stored record
        tokio::time::timeout(Duration::from_secs(5), async {
            while invoker.removed.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(*invoker.removed.lock().unwrap(), vec![SESSION.to_string()]);
        assert!(service.read(SESSION).await.is_err());

        cancel.cancel();
        dispatcher.await.unwrap();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let Relay {
            invoker,
            service,
            processor: _processor,
            signals,
        } = relay(dir.path());
        let (notifiers, notifications) = notification_channels(4);

        let cancel = CancellationToken::new();
        let dispatcher = tokio::spawn(HookDispatcher::new(service.clone()).run(
            notifications,
            signals,
            cancel.clone(),
        ));

        // Neither upload exists
        let unknown = "ffffffffffffffffffffffffffffffff";
        notifiers
            .notify(HookKind::PostFinish, created(unknown))
            .await
            .unwrap();
        notifiers
            .notify(HookKind::PostTerminate, created(unknown))
            .await
            .unwrap();

        // Still alive: a later create is processed
        notifiers.notify(HookKind::PostCreate, created(SESSION)).await.unwrap();
        wait_for(&service, SESSION, true).await;

        cancel.cancel();
        dispatcher.await.unwrap();
        assert!(invoker.removed.lock().unwrap().is_empty());
    }
}
