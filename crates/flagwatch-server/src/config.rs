//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the dashboard can start with zero
//! configuration against the built-in networks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use flagwatch_core::{SessionSettings, VoteDedupe};
use flagwatch_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_NETWORK, DEFAULT_PAGE_SIZE, DEFAULT_REFRESH_INTERVAL_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WINDOW_DAYS,
};
use flagwatch_source::NetworkRegistry;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Network used when a request selects none or an unknown one.
    /// Env: `DEFAULT_NETWORK`
    /// Default: `mumbai`
    pub default_network: String,

    /// Flags requested per page.
    /// Env: `PAGE_SIZE`
    /// Default: `1000`
    pub page_size: usize,

    /// Sweep window in days before today (UTC midnight).
    /// Env: `WINDOW_DAYS`
    /// Default: `30`
    pub window_days: u32,

    /// Seconds between full re-queries of the window.
    /// Env: `REFRESH_INTERVAL_SECS`
    /// Default: `300`
    pub refresh_interval_secs: u64,

    /// Per-request timeout against the query endpoint.
    /// Env: `REQUEST_TIMEOUT_SECS`
    /// Default: `30`
    pub request_timeout_secs: u64,

    /// Treatment of repeated votes by one voter.
    /// Env: `VOTE_DEDUPE` (`last-wins` / `keep-all`)
    /// Default: `last-wins`
    pub vote_dedupe: VoteDedupe,

    /// Serve every network from a saved query response instead of the
    /// live endpoint.
    /// Env: `REPLAY_FILE`
    /// Default: unset
    pub replay_file: Option<PathBuf>,

    // -- Network endpoints --

    /// Env: `MUMBAI_GRAPH_URL`, `MUMBAI_HUB_URL`,
    /// `POLYGON_GRAPH_URL`, `POLYGON_HUB_URL`
    pub networks: NetworkRegistry,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            default_network: DEFAULT_NETWORK.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            window_days: DEFAULT_WINDOW_DAYS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            vote_dedupe: VoteDedupe::default(),
            replay_file: None,
            networks: NetworkRegistry::builtin(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(n) = parse_positive(&var, "PAGE_SIZE") {
            config.page_size = n;
        }

        if let Some(val) = var("WINDOW_DAYS") {
            match val.parse::<u32>() {
                Ok(days) => config.window_days = days,
                Err(_) => tracing::warn!(value = %val, "Invalid WINDOW_DAYS, using default"),
            }
        }

        if let Some(n) = parse_positive(&var, "REFRESH_INTERVAL_SECS") {
            config.refresh_interval_secs = n as u64;
        }

        if let Some(n) = parse_positive(&var, "REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = n as u64;
        }

        if let Some(val) = var("VOTE_DEDUPE") {
            match VoteDedupe::parse(&val) {
                Some(policy) => config.vote_dedupe = policy,
                None => tracing::warn!(value = %val, "Invalid VOTE_DEDUPE, using default"),
            }
        }

        if let Some(path) = var("REPLAY_FILE").filter(|p| !p.is_empty()) {
            config.replay_file = Some(PathBuf::from(path));
        }

        // -- Network endpoints --

        for (name, graph_key, hub_key) in [
            ("mumbai", "MUMBAI_GRAPH_URL", "MUMBAI_HUB_URL"),
            ("polygon", "POLYGON_GRAPH_URL", "POLYGON_HUB_URL"),
        ] {
            if let Some(network) = config.networks.get_mut(name) {
                if let Some(url) = var(graph_key).filter(|u| !u.is_empty()) {
                    network.graph_url = url;
                }
                if let Some(url) = var(hub_key).filter(|u| !u.is_empty()) {
                    network.hub_url = url.trim_end_matches('/').to_string();
                }
            }
        }

        if let Some(name) = var("DEFAULT_NETWORK") {
            match config.networks.set_default(&name) {
                Ok(()) => config.default_network = name,
                Err(e) => tracing::warn!(error = %e, "Invalid DEFAULT_NETWORK, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            page_size: self.page_size,
            window_days: self.window_days,
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            dedupe: self.vote_dedupe,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_positive<F>(var: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let val = var(key)?;
    match val.parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(key, value = %val, "Expected a positive integer, using default");
            None
        }
    }
}
