//! # Auth Provider
//!
//! Obtains and caches the bearer credential for the ingestion service.
//!
//! ## Authentication Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Demand-Driven Authentication                       │
//! │                                                                         │
//! │  ┌────────────────┐                       ┌─────────────────┐           │
//! │  │ OutboxProcessor│                       │  Auth endpoint  │           │
//! │  └───────┬────────┘                       └────────┬────────┘           │
//! │          │                                         │                    │
//! │          │  item has no token, or got a 401        │                    │
//! │          │                                         │                    │
//! │          │  POST {"login": .., "password": ..}     │                    │
//! │          │────────────────────────────────────────►│                    │
//! │          │                                         │                    │
//! │          │  200 {"<token_field>": "<raw>", ...}    │                    │
//! │          │◄────────────────────────────────────────│                    │
//! │          │                                         │                    │
//! │  cache = token_header + raw   (e.g. "Bearer eyJ...")                    │
//! │                                                                         │
//! │  There is no background refresh: a token is replaced only when the     │
//! │  delivery worker asks for a new one.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Capability
// =============================================================================

/// Source of credentials for the delivery worker.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Logs in again and returns the fresh header value.
    async fn authorize(&self) -> SyncResult<String>;

    /// Returns the cached header value; empty before the first login.
    async fn current_token(&self) -> String;
}

// =============================================================================
// Auth Provider
// =============================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

/// Login client for the ingestion service.
///
/// Also owns the timeout-bounded HTTP client that the multipart transport
/// reuses, so every outbound request shares one connection pool.
pub struct AuthProvider {
    config: AuthConfig,
    client: reqwest::Client,
    token: RwLock<String>,
}

impl AuthProvider {
    /// Creates a provider.
    ///
    /// ## Errors
    /// `InvalidConfig` if any of url, token field, token header, login or
    /// password is empty.
    pub fn new(config: AuthConfig) -> SyncResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(AuthProvider {
            config,
            client,
            token: RwLock::new(String::new()),
        })
    }

    /// Shared HTTP client.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn login(&self) -> SyncResult<String> {
        debug!(url = %self.config.url, login = %self.config.login, "Requesting token");

        let response = self
            .client
            .post(&self.config.url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .json(&LoginRequest {
                login: &self.config.login,
                password: &self.config.password,
            })
            .send()
            .await
            .map_err(|e| SyncError::AuthFailed(format!("request: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SyncError::AuthFailed(format!("status code = {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::AuthFailed(format!("read body: {}", e)))?;

        let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| SyncError::AuthFailed(format!("unmarshal body: {}", e)))?;

        match fields.get(&self.config.token_field) {
            Some(serde_json::Value::String(raw)) => {
                Ok(format!("{}{}", self.config.token_header, raw))
            }
            Some(_) => Err(SyncError::AuthFailed(format!(
                "field '{}' is not a string",
                self.config.token_field
            ))),
            None => Err(SyncError::AuthFailed(format!(
                "response has no '{}' field",
                self.config.token_field
            ))),
        }
    }
}

#[async_trait]
impl Authorizer for AuthProvider {
    async fn authorize(&self) -> SyncResult<String> {
        match self.login().await {
            Ok(token) => {
                *self.token.write().await = token.clone();
                info!("Authorized with ingestion service");
                Ok(token)
            }
            Err(e) => {
                warn!(?e, "Authorization failed");
                Err(e)
            }
        }
    }

    async fn current_token(&self) -> String {
        self.token.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config(url: String) -> AuthConfig {
        AuthConfig {
            url,
            token_field: "token".into(),
            token_header: "Bearer ".into(),
            login: "uploader".into(),
            password: "secret".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_rejects_incomplete_config() {
        let mut cfg = config("http://localhost/login".into());
        cfg.login.clear();
        assert!(matches!(
            AuthProvider::new(cfg),
            Err(SyncError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_authorize_caches_prefixed_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/login")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"login": "uploader", "password": "secret"})))
            .with_status(200)
            .with_body(r#"{"token": "abc123", "user": "uploader"}"#)
            .create_async()
            .await;

        let provider = AuthProvider::new(config(format!("{}/login", server.url()))).unwrap();
        assert_eq!(provider.current_token().await, "");

        let token = provider.authorize().await.unwrap();

        assert_eq!(token, "Bearer abc123");
        assert_eq!(provider.current_token().await, "Bearer abc123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_ok_status_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/login")
            .with_status(403)
            .create_async()
            .await;

        let provider = AuthProvider::new(config(format!("{}/login", server.url()))).unwrap();

        assert!(matches!(
            provider.authorize().await,
            Err(SyncError::AuthFailed(_))
        ));
        assert_eq!(provider.current_token().await, "");
    }

    #[tokio::test]
    async fn test_missing_field_or_bad_json_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/login")
            .with_status(200)
            .with_body(r#"{"access": "abc123"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/login-html")
            .with_status(200)
            .with_body("<html>welcome</html>")
            .create_async()
            .await;

        let provider = AuthProvider::new(config(format!("{}/login", server.url()))).unwrap();
        assert!(provider.authorize().await.is_err());

        let provider = AuthProvider::new(config(format!("{}/login-html", server.url()))).unwrap();
        assert!(provider.authorize().await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        // Port 9 on localhost is discard; nothing should be listening
        let provider = AuthProvider::new(config("http://127.0.0.1:9/login".into())).unwrap();
        assert!(matches!(
            provider.authorize().await,
            Err(SyncError::AuthFailed(_))
        ));
    }
}
