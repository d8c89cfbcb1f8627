//! File-store upload invoker.
//!
//! The reference upload engine keeps each upload as two files in its upload
//! directory: the blob `<id><ext>` and the engine's own `<id>.info` sidecar.
//! Removing an upload deletes both; files that are already gone count as
//! removed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use relay_db::{DbError, DbResult, UploadStoreInvoker};
use tracing::debug;

/// Discards uploads from the engine's directory.
#[derive(Debug, Clone)]
pub struct FileStoreInvoker {
    upload_dir: PathBuf,
    file_ext: String,
}

impl FileStoreInvoker {
    pub fn new(upload_dir: impl Into<PathBuf>, file_ext: impl Into<String>) -> Self {
        FileStoreInvoker {
            upload_dir: upload_dir.into(),
            file_ext: file_ext.into(),
        }
    }

    fn files(&self, session_id: &str) -> [PathBuf; 2] {
        [
            self.upload_dir
                .join(format!("{}{}", session_id, self.file_ext)),
            self.upload_dir.join(format!("{}.info", session_id)),
        ]
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl UploadStoreInvoker for FileStoreInvoker {
    async fn remove(&self, session_id: &str) -> DbResult<()> {
        if session_id.is_empty() || session_id.contains(['/', '\\']) || session_id == ".." {
            return Err(DbError::InvokerFailed {
                id: session_id.to_string(),
                reason: "not a valid upload id".to_string(),
            });
        }

        for path in self.files(session_id) {
            let removed = remove_if_present(&path)
                .await
                .map_err(|e| DbError::InvokerFailed {
                    id: session_id.to_string(),
                    reason: format!("{}: {}", path.display(), e),
                })?;
            debug!(session_id = %session_id, path = %path.display(), removed, "Upload file discarded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    #[tokio::test]
    async fn test_removes_blob_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join(format!("{}.bin", ID));
        let info = dir.path().join(format!("{}.info", ID));
        std::fs::write(&blob, b"hello world!").unwrap();
        std::fs::write(&info, b"{}").unwrap();

        let invoker = FileStoreInvoker::new(dir.path(), ".bin");
        invoker.remove(ID).await.unwrap();

        assert!(!blob.exists());
        assert!(!info.exists());
    }

    #[tokio::test]
    async fn test_second_remove_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ID), b"x").unwrap();

        let invoker = FileStoreInvoker::new(dir.path(), "");
        invoker.remove(ID).await.unwrap();
        invoker.remove(ID).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = FileStoreInvoker::new(dir.path(), "");

        assert!(invoker.remove("../etc/passwd").await.is_err());
        assert!(invoker.remove("").await.is_err());
    }
}
