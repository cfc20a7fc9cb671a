//! # flagwatch-server
//!
//! Monitoring dashboard backend for operator flag events.
//!
//! This binary provides:
//! - **Paginated sweeps** of flag events from a network's GraphQL endpoint,
//!   starting a fixed number of days back and refreshed on an interval
//! - **Derived views**: daily histogram, unique flaggers, vote alignment,
//!   weighted kick fraction and actor rankings
//! - **REST API** (axum) serving those views as JSON for the front end

mod api;
mod config;
mod error;
mod views;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use flagwatch_core::SessionManager;
use flagwatch_shared::constants::APP_NAME;
use flagwatch_source::{Connector, GraphQlConnector, MemoryConnector, MemorySource};

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,flagwatch_server=debug,flagwatch_core=debug")
        }))
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Choose the event source
    // -----------------------------------------------------------------------
    let connector: Arc<dyn Connector> = match &config.replay_file {
        Some(path) => {
            let source = MemorySource::from_response_file("replay", path)?;
            info!(path = %path.display(), "Replaying saved query response");
            Arc::new(MemoryConnector::new(Arc::new(source)))
        }
        None => Arc::new(GraphQlConnector {
            timeout: config.request_timeout(),
        }),
    };

    // -----------------------------------------------------------------------
    // 4. Start the default session
    // -----------------------------------------------------------------------
    let sessions = Arc::new(SessionManager::new(
        config.networks.clone(),
        connector,
        config.session_settings(),
    ));
    sessions.select(None).await?;

    let app_state = AppState {
        sessions: sessions.clone(),
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                sessions.shutdown().await;
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    sessions.shutdown().await;
    Ok(())
}
