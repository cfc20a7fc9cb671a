//! The paged read contract every event source implements.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use flagwatch_shared::{Flag, Timestamp};

use crate::registry::NetworkConfig;

/// The source could not deliver a page. Every variant is a
/// "source unavailable" condition: the driver stops and keeps what it has.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Query endpoint returned HTTP {0}")]
    Status(u16),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// A query-capable endpoint returning flags ordered by timestamp.
///
/// `fetch_page` returns at most `page_size` flags whose timestamp is
/// strictly greater than `since`, ascending. One call is one round-trip;
/// implementations do not retry.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_page(&self, since: Timestamp, page_size: usize)
        -> Result<Vec<Flag>, SourceError>;

    /// Network name, for logs.
    fn name(&self) -> &str;
}

/// Builds a session-scoped source for a configured network.
pub trait Connector: Send + Sync {
    fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn EventSource>, SourceError>;
}
