//! # Relay Server
//!
//! ```text
//! relay-server [--config <path>]
//! ```
//!
//! Stops on Ctrl+C or SIGTERM.

use anyhow::Context;
use relay_server::config::resolve_config_path;
use relay_server::{init_tracing, RelayConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting log relay...");

    let path = resolve_config_path(std::env::args().skip(1), |name| std::env::var(name).ok());
    let config = RelayConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    info!(
        bind_addr = %config.server.bind_addr,
        db_path = %config.store.db_path.display(),
        base_url = %config.delivery.base_url,
        "Configuration loaded"
    );

    relay_server::run(config, shutdown_signal())
        .await
        .context("relay failed")?;

    info!("Relay shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
