//! # Upload Service
//!
//! Business rules for the upload lifecycle, on top of the metadata repository
//! and the delivery queue.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Upload Lifecycle                                 │
//! │                                                                         │
//! │  pre-create     validate(data)                                         │
//! │                  ├─ parse JSON, field policy                           │
//! │                  └─ composite key already stored? → Duplicate          │
//! │                                                                         │
//! │  post-create    create(id, data, filename)                             │
//! │                  └─ stamp SessionID, FileName, StartTimestamp → store  │
//! │                                                                         │
//! │  post-receive   progress(id)              (no-op)                      │
//! │                                                                         │
//! │  post-finish    complete(id)                                           │
//! │                  ├─ merge FinishTimestamp into the stored record       │
//! │                  └─ enqueue(id, FileName, SerialNumber)                │
//! │                                                                         │
//! │  post-terminate terminate(id)                                          │
//! │  delivered      └─ remove both keys, then the blob                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use relay_core::timestamp::now_unix_date;
use relay_core::validation::{validate_for_storage, validate_metadata};
use relay_core::UploadRecord;
use relay_db::MetadataRepository;
use relay_sync::OutboxHandle;
use tracing::{debug, info};

use crate::engine::{PreCreateHook, UploadInfo, METADATA_DATA_KEY};
use crate::error::{HookError, HookResult};

/// Orchestrates the repository and the delivery queue per lifecycle event.
#[derive(Clone)]
pub struct UploadService {
    repository: Arc<MetadataRepository>,
    outbox: OutboxHandle,
}

impl UploadService {
    pub fn new(repository: Arc<MetadataRepository>, outbox: OutboxHandle) -> Self {
        UploadService { repository, outbox }
    }

    /// Admission check for a new upload.
    ///
    /// ## Errors
    /// - `Validation` if the metadata is malformed or out of policy
    /// - `Duplicate` if a record with the same serial number and collection
    ///   timestamp is stored
    /// - `Storage` if the lookup itself failed
    pub async fn validate(&self, id: &str, data: &str) -> HookResult<()> {
        let record = UploadRecord::from_metadata(data)?;
        validate_metadata(&record)?;

        let key = record.composite_key();
        match self.repository.find_by_id(&key).await {
            Ok(_) => Err(HookError::Duplicate { key }),
            Err(e) if e.is_not_found() => {
                debug!(session_id = %id, serial_number = %record.serial_number, "Upload admitted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stores the business record for an admitted upload.
    pub async fn create(&self, id: &str, data: &str, file_name: &str) -> HookResult<()> {
        let mut record = UploadRecord::from_metadata(data)?;
        record.session_id = id.to_string();
        record.file_name = file_name.to_string();
        record.start_timestamp = now_unix_date();

        validate_for_storage(&record)?;
        self.repository.store(&record).await?;

        info!(session_id = %id, serial_number = %record.serial_number, "Upload created");
        Ok(())
    }

    /// Bytes were received. Nothing to record.
    pub async fn progress(&self, _id: &str) -> HookResult<()> {
        Ok(())
    }

    /// Deletes the record and discards the blob.
    pub async fn terminate(&self, id: &str) -> HookResult<()> {
        self.repository.remove(id).await?;
        Ok(())
    }

    /// Stamps the finish time and queues the upload for delivery.
    ///
    /// On failure the blob is left in place.
    pub async fn complete(&self, id: &str) -> HookResult<()> {
        let patch = UploadRecord {
            session_id: id.to_string(),
            finish_timestamp: now_unix_date(),
            ..Default::default()
        };
        self.repository.update(&patch).await?;

        let record = self.repository.find_by_id(id).await?;
        self.outbox
            .enqueue(&record.session_id, &record.file_name, &record.serial_number)
            .await?;

        info!(session_id = %id, serial_number = %record.serial_number, "Upload queued for delivery");
        Ok(())
    }

    /// Reads a stored record by session id or composite key.
    pub async fn read(&self, id: &str) -> HookResult<UploadRecord> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Session ids of every stored record.
    pub async fn list_sessions(&self) -> HookResult<Vec<String>> {
        Ok(self.repository.read_all().await?)
    }
}

#[async_trait]
impl PreCreateHook for UploadService {
    async fn pre_create(&self, info: &UploadInfo) -> HookResult<()> {
        self.validate(&info.id, info.meta(METADATA_DATA_KEY)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_db::{DbResult, MemoryKvStore, UploadStoreInvoker};
    use relay_sync::{
        Authorizer, DeliveryConfig, OutboxProcessor, PendingDelivery, SyncResult, UploadTransport,
    };
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    const SESSION: &str = "0123456789abcdef0123456789abcdef";
    const METADATA: &str = r#"{
        "SerialNumber": "0123456789",
        "LogCollectionTimestamp": "Mon Jan  2 15:04:05 MST 2006",
        "ClientStartTimestamp": "Mon Jan  2 15:04:05 MST 2006",
        "Hostname": "bmc-01"
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

    #[derive(Default)]
    struct RecordingTransport {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UploadTransport for RecordingTransport {
        async fn upload(&self, item: &PendingDelivery) -> SyncResult<StatusCode> {
            self.urls.lock().unwrap().push(item.url.to_string());
            Ok(StatusCode::CREATED)
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        service: UploadService,
        invoker: Arc<RecordingInvoker>,
        transport: Arc<RecordingTransport>,
        processor: Option<OutboxProcessor>,
        signals: mpsc::Receiver<String>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let invoker = Arc::new(RecordingInvoker::default());
        let repository = Arc::new(
            MetadataRepository::new(Arc::new(MemoryKvStore::new()), invoker.clone(), "root")
                .unwrap(),
        );

        let transport = Arc::new(RecordingTransport::default());
        let config = DeliveryConfig {
            base_url: "http://ingest.local/api/logs".into(),
            upload_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let (processor, outbox, signals) =
            OutboxProcessor::new(config, Arc::new(StaticAuth), transport.clone()).unwrap();

        Fixture {
            dir,
            service: UploadService::new(repository, outbox),
            invoker,
            transport,
            processor: Some(processor),
            signals,
        }
    }

    #[tokio::test]
    async fn test_validate_then_create_stores_record() {
        let f = fixture();

        f.service.validate("", METADATA).await.unwrap();
        f.service.create(SESSION, METADATA, "world").await.unwrap();

        let record = f.service.read(SESSION).await.unwrap();
        assert!(relay_core::timestamp::parse_unix_date(&record.start_timestamp).is_ok());

        // Everything the client sent survives the round trip through the store
        let expected = UploadRecord {
            session_id: SESSION.to_string(),
            file_name: "world".to_string(),
            start_timestamp: record.start_timestamp.clone(),
            ..UploadRecord::from_metadata(METADATA).unwrap()
        };
        assert_eq!(record, expected);
        assert_eq!(record.hostname, "bmc-01");
        assert_eq!(f.service.read(&record.composite_key()).await.unwrap(), expected);
        assert_eq!(f.service.list_sessions().await.unwrap(), vec![SESSION.to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_business_key_is_rejected() {
        let f = fixture();
        f.service.create(SESSION, METADATA, "world").await.unwrap();

        let err = f.service.validate("", METADATA).await.unwrap_err();

        assert!(matches!(err, HookError::Duplicate { .. }));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_metadata() {
        let f = fixture();

        assert!(matches!(
            f.service.validate("", "{not json").await,
            Err(HookError::Validation(_))
        ));
        assert!(matches!(
            f.service
                .validate("", r#"{"SerialNumber": "", "LogCollectionTimestamp": "x"}"#)
                .await,
            Err(HookError::Validation(_))
        ));

        let long_host = METADATA.replace("bmc-01", &"h".repeat(65));
        assert!(matches!(
            f.service.validate("", &long_host).await,
            Err(HookError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_pre_create_reads_data_key() {
        let f = fixture();
        let mut metadata = HashMap::new();
        metadata.insert(METADATA_DATA_KEY.to_string(), METADATA.to_string());
        let info = UploadInfo {
            metadata,
            ..Default::default()
        };
        f.service.pre_create(&info).await.unwrap();

        assert!(f.service.pre_create(&UploadInfo::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_create_requires_file_name() {
        let f = fixture();

        assert!(matches!(
            f.service.create(SESSION, METADATA, "").await,
            Err(HookError::Validation(_))
        ));
        assert!(matches!(
            f.service.read(SESSION).await,
            Err(HookError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_terminate_removes_record_and_blob() {
        let f = fixture();
        f.service.create(SESSION, METADATA, "world").await.unwrap();

        f.service.terminate(SESSION).await.unwrap();

        assert!(matches!(
            f.service.read(SESSION).await,
            Err(HookError::NotFound { .. })
        ));
        assert_eq!(*f.invoker.removed.lock().unwrap(), vec![SESSION.to_string()]);
        assert!(matches!(
            f.service.terminate(SESSION).await,
            Err(HookError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_complete_stamps_and_delivers() {
        let mut f = fixture();
        std::fs::write(f.dir.path().join(SESSION), b"hello world!").unwrap();
        f.service.create(SESSION, METADATA, "world").await.unwrap();

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(f.processor.take().unwrap().run(cancel.clone()));

        f.service.complete(SESSION).await.unwrap();

        let record = f.service.read(SESSION).await.unwrap();
        assert!(!record.finish_timestamp.is_empty());
        assert_eq!(record.file_name, "world");

        let delivered = tokio::time::timeout(Duration::from_secs(5), f.signals.recv())
            .await
            .unwrap();
        assert_eq!(delivered.as_deref(), Some(SESSION));
        assert_eq!(
            *f.transport.urls.lock().unwrap(),
            vec!["http://ingest.local/api/logs/0123456789".to_string()]
        );

        cancel.cancel();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_without_blob_fails_and_keeps_record() {
        let f = fixture();
        f.service.create(SESSION, METADATA, "world").await.unwrap();

        let err = f.service.complete(SESSION).await.unwrap_err();
        assert!(matches!(err, HookError::Undeliverable(_)));
        assert!(!err.is_rejection());
        assert!(f.service.read(SESSION).await.is_ok());
        assert!(f.invoker.removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_unknown_upload() {
        let f = fixture();
        assert!(matches!(
            f.service.complete(SESSION).await,
            Err(HookError::NotFound { .. })
        ));
    }
}
