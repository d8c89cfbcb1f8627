//! # Upload Transport
//!
//! Sends one pending delivery to the ingestion service and reports the HTTP
//! status. Interpreting the status is the outbox worker's job.
//!
//! ## Request Shape
//! ```text
//! POST <base_url>/<serial_number>
//! Authorization: <token_header><raw token>
//! Content-Type: multipart/form-data; boundary=...
//!
//! --boundary
//! Content-Disposition: form-data; name="<field_form>"; filename="<file_name>"
//! Content-Type: application/octet-stream
//!
//! <blob bytes, streamed from <upload_dir>/<session_id><file_ext>>
//! --boundary--
//! ```

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::outbox::PendingDelivery;

/// Delivers a pending item; returns the downstream status code.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload(&self, item: &PendingDelivery) -> SyncResult<StatusCode>;
}

/// Streams the blob from disk as a multipart form.
#[derive(Debug, Clone)]
pub struct MultipartTransport {
    client: reqwest::Client,
}

impl MultipartTransport {
    /// Wraps a shared client (see `AuthProvider::http_client`).
    pub fn new(client: reqwest::Client) -> Self {
        MultipartTransport { client }
    }
}

#[async_trait]
impl UploadTransport for MultipartTransport {
    async fn upload(&self, item: &PendingDelivery) -> SyncResult<StatusCode> {
        let file = tokio::fs::File::open(&item.file_path)
            .await
            .map_err(|_| SyncError::SourceMissing {
                path: item.file_path.display().to_string(),
            })?;
        let length = file
            .metadata()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?
            .len();

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
            .file_name(item.file_name.clone())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part(item.field_form.clone(), part);

        debug!(
            session_id = %item.session_id,
            url = %item.url,
            bytes = length,
            "Uploading to ingestion service"
        );

        let response = self
            .client
            .post(item.url.as_str())
            .header(reqwest::header::AUTHORIZATION, item.token.as_str())
            .multipart(form)
            .send()
            .await?;

        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn pending(url: String, file_path: std::path::PathBuf) -> PendingDelivery {
        let url = url::Url::parse(&url).unwrap();
        PendingDelivery {
            session_id: "0123456789abcdef0123456789abcdef".into(),
            token: "Bearer abc".into(),
            file_name: "world".into(),
            url,
            file_path,
            field_form: "file".into(),
            auth_retries: 0,
        }
    }

    #[tokio::test]
    async fn test_streams_file_as_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, b"hello world!").unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ingest/0123456789")
            .match_header("authorization", "Bearer abc")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".into()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="world""#.into()),
                Matcher::Regex("hello world!".into()),
            ]))
            .with_status(201)
            .create_async()
            .await;

        let transport = MultipartTransport::new(reqwest::Client::new());
        let item = pending(format!("{}/ingest/0123456789", server.url()), path);

        let status = transport.upload(&item).await.unwrap();

        assert_eq!(status, StatusCode::CREATED);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reports_status_without_judging_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, b"x").unwrap();

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/ingest")
            .with_status(401)
            .create_async()
            .await;

        let transport = MultipartTransport::new(reqwest::Client::new());
        let status = transport
            .upload(&pending(format!("{}/ingest", server.url()), path))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_source_file() {
        let transport = MultipartTransport::new(reqwest::Client::new());
        let item = pending(
            "http://127.0.0.1:9/ingest".into(),
            "/definitely/not/here.bin".into(),
        );

        assert!(matches!(
            transport.upload(&item).await,
            Err(SyncError::SourceMissing { .. })
        ));
    }
}
