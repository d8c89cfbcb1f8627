//! # Delivery Configuration
//!
//! Settings for the downstream ingestion target and its auth endpoint.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority, credentials only)         │
//! │     RELAY_AUTH_LOGIN=uploader                                          │
//! │     RELAY_AUTH_PASSWORD=...                                            │
//! │                                                                         │
//! │  2. TOML Config File ([delivery] and [auth] of relay.toml)             │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     queue_capacity = 10, timeout_secs = 30, token_header = "Bearer "   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [delivery]
//! base_url = "https://ingest.example.com/api/v1/logs"
//! upload_dir = "/var/lib/relay/uploads"
//! field_form = "file"
//! file_ext = ".bin"
//!
//! [auth]
//! url = "https://ingest.example.com/api/v1/login"
//! token_field = "token"
//! token_header = "Bearer "
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Environment variable overriding [`AuthConfig::login`].
pub const ENV_AUTH_LOGIN: &str = "RELAY_AUTH_LOGIN";

/// Environment variable overriding [`AuthConfig::password`].
pub const ENV_AUTH_PASSWORD: &str = "RELAY_AUTH_PASSWORD";

// =============================================================================
// Delivery Settings
// =============================================================================

/// Where finished uploads are read from and sent to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Base URL of the ingestion service; the serial number is appended.
    #[serde(default)]
    pub base_url: String,

    /// Directory holding the upload engine's blobs.
    #[serde(default)]
    pub upload_dir: PathBuf,

    /// Multipart form field carrying the file.
    #[serde(default = "default_field_form")]
    pub field_form: String,

    /// Suffix of blob files in `upload_dir` (may be empty).
    #[serde(default)]
    pub file_ext: String,

    /// Capacity of the delivery queue. Producers wait once it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_field_form() -> String {
    "file".to_string()
}

fn default_queue_capacity() -> usize {
    10
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            base_url: String::new(),
            upload_dir: PathBuf::new(),
            field_form: default_field_form(),
            file_ext: String::new(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DeliveryConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.base_url.is_empty() {
            return Err(SyncError::InvalidConfig("delivery.base_url is required".into()));
        }
        if self.upload_dir.as_os_str().is_empty() {
            return Err(SyncError::InvalidConfig("delivery.upload_dir is required".into()));
        }
        if self.field_form.is_empty() {
            return Err(SyncError::InvalidConfig("delivery.field_form is required".into()));
        }
        if self.queue_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "delivery.queue_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Auth Settings
// =============================================================================

/// Login endpoint and credential for the ingestion service.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Login endpoint.
    #[serde(default)]
    pub url: String,

    /// Field of the login response holding the raw token.
    #[serde(default = "default_token_field")]
    pub token_field: String,

    /// Prefix placed before the raw token in the `Authorization` header.
    #[serde(default = "default_token_header")]
    pub token_header: String,

    #[serde(default)]
    pub login: String,

    #[serde(default)]
    pub password: String,

    /// Timeout applied to every request of the shared HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_token_field() -> String {
    "token".to_string()
}

fn default_token_header() -> String {
    "Bearer ".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            url: String::new(),
            token_field: default_token_field(),
            token_header: default_token_header(),
            login: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("url", &self.url)
            .field("token_field", &self.token_field)
            .field("token_header", &self.token_header)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// Every field that takes part in the login exchange must be set.
    pub fn validate(&self) -> SyncResult<()> {
        let required = [
            ("auth.url", &self.url),
            ("auth.token_field", &self.token_field),
            ("auth.token_header", &self.token_header),
            ("auth.login", &self.login),
            ("auth.password", &self.password),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(SyncError::InvalidConfig(format!("{} is required", name)));
            }
        }
        if self.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "auth.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Applies credential overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(login) = lookup(ENV_AUTH_LOGIN) {
            debug!(login = %login, "Overriding auth login from environment");
            self.login = login;
        }
        if let Some(password) = lookup(ENV_AUTH_PASSWORD) {
            debug!("Overriding auth password from environment");
            self.password = password;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig {
            url: "http://localhost/login".into(),
            login: "uploader".into(),
            password: "secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_delivery_defaults_and_validation() {
        let mut config = DeliveryConfig::default();
        assert_eq!(config.queue_capacity, 10);
        assert!(config.validate().is_err());

        config.base_url = "http://localhost/ingest".into();
        config.upload_dir = "/tmp/uploads".into();
        assert!(config.validate().is_ok());

        config.field_form.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_requires_every_field() {
        assert!(auth().validate().is_ok());

        let mut missing_password = auth();
        missing_password.password.clear();
        let err = missing_password.validate().unwrap_err();
        assert!(err.to_string().contains("auth.password"));

        let mut missing_header = auth();
        missing_header.token_header.clear();
        assert!(missing_header.validate().is_err());
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut config = auth();
        config.apply_overrides(|name| match name {
            ENV_AUTH_LOGIN => Some("from-env".to_string()),
            _ => None,
        });

        assert_eq!(config.login, "from-env");
        assert_eq!(config.password, "secret");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", auth());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_toml_sections() {
        let delivery: DeliveryConfig = toml::from_str(
            r#"
            base_url = "http://localhost/ingest"
            upload_dir = "/tmp/uploads"
            "#,
        )
        .unwrap();
        assert_eq!(delivery.field_form, "file");
        assert_eq!(delivery.queue_capacity, 10);
    }
}
