//! Relay server configuration.
//!
//! Configuration is read from a TOML file, then credentials may be overridden
//! from the environment.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  File path:  --config <path>  >  RELAY_CONFIG  >  ./config/relay.toml  │
//! │                                                                         │
//! │  Values:     RELAY_AUTH_LOGIN / RELAY_AUTH_PASSWORD                    │
//! │                 > relay.toml                                            │
//! │                 > defaults                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_core::DEFAULT_COLLECTION;
use relay_sync::{AuthConfig, DeliveryConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG";

/// Config file used when neither `--config` nor `RELAY_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/relay.toml";

/// Complete relay server configuration (`relay.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Hook listener and process lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the hook receiver listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Seconds to wait for tasks after shutdown is requested
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,

    /// Capacity of each engine notification channel
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_grace_secs() -> u64 {
    5
}

fn default_notification_capacity() -> usize {
    16
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            grace_secs: default_grace_secs(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

impl ServerConfig {
    /// Shutdown grace period.
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

/// Metadata store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Collection holding the upload records
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("relay.db")
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            db_path: default_db_path(),
            collection: default_collection(),
        }
    }
}

impl RelayConfig {
    /// Loads, overrides and validates the configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config = Self::from_toml(&text)?;
        config.auth.apply_env_overrides();
        config.validate()?;

        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parses a TOML document without validating it.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks every section; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue("server.bind_addr".to_string()))?;
        if self.server.grace_secs == 0 {
            return Err(ConfigError::InvalidValue("server.grace_secs".to_string()));
        }
        if self.server.notification_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "server.notification_capacity".to_string(),
            ));
        }
        if self.store.db_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("store.db_path".to_string()));
        }
        if self.store.collection.is_empty() {
            return Err(ConfigError::MissingRequired("store.collection".to_string()));
        }

        self.delivery
            .validate()
            .map_err(|e| ConfigError::Section(e.to_string()))?;
        self.auth
            .validate()
            .map_err(|e| ConfigError::Section(e.to_string()))?;
        Ok(())
    }
}

/// Picks the config file: `--config <path>`, then `RELAY_CONFIG`, then the default.
pub fn resolve_config_path(
    args: impl IntoIterator<Item = String>,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return PathBuf::from(path);
        }
    }

    env(ENV_CONFIG_PATH)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Malformed configuration: {0}")]
    Parse(String),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("{0}")]
    Section(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        bind_addr = "0.0.0.0:1080"

        [store]
        db_path = "/var/lib/relay/relay.db"

        [delivery]
        base_url = "https://ingest.example.com/api/logs"
        upload_dir = "/var/lib/relay/uploads"

        [auth]
        url = "https://ingest.example.com/api/login"
        login = "uploader"
        password = "secret"
    "#;

    #[test]
    fn test_parses_sections_with_defaults() {
        let config = RelayConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.server.bind_addr, "0.0.0.0:1080");
        assert_eq!(config.server.grace_period(), Duration::from_secs(5));
        assert_eq!(config.store.collection, "root");
        assert_eq!(config.delivery.field_form, "file");
        assert_eq!(config.auth.token_header, "Bearer ");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_reports_first_problem() {
        let mut config = RelayConfig::from_toml(SAMPLE).unwrap();
        config.server.bind_addr = "not-an-addr".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(ref f)) if f == "server.bind_addr"
        ));

        let mut config = RelayConfig::from_toml(SAMPLE).unwrap();
        config.store.collection.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));

        let mut config = RelayConfig::from_toml(SAMPLE).unwrap();
        config.auth.password.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auth.password"));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            RelayConfig::from_toml("[server"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config.delivery.base_url, "https://ingest.example.com/api/logs");

        assert!(matches!(
            RelayConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_config_path_resolution() {
        let no_env = |_: &str| None;
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            resolve_config_path(args(&["relay-server", "--config", "/etc/relay.toml"]), no_env),
            PathBuf::from("/etc/relay.toml")
        );
        assert_eq!(
            resolve_config_path(args(&["relay-server", "--config=/tmp/r.toml"]), no_env),
            PathBuf::from("/tmp/r.toml")
        );
        assert_eq!(
            resolve_config_path(args(&["relay-server"]), |name| {
                (name == ENV_CONFIG_PATH).then(|| "/srv/relay.toml".to_string())
            }),
            PathBuf::from("/srv/relay.toml")
        );
        assert_eq!(
            resolve_config_path(args(&["relay-server"]), no_env),
            PathBuf::from(DEFAULT_CONFIG_PATH)
        );
    }
}
