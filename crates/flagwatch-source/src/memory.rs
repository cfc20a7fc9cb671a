//! In-memory event source.
//!
//! Serves pages out of a fixed flag list with the same strictly-after,
//! ascending contract as the subgraph. Used for offline replay of a saved
//! query response and as a deterministic source in tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use flagwatch_shared::{Flag, Timestamp};

use crate::registry::NetworkConfig;
use crate::source::{Connector, EventSource, SourceError};
use crate::wire::{FlagsData, GraphQlResponse};

#[derive(Debug, Default)]
struct RequestLog {
    cursors: Vec<Timestamp>,
}

pub struct MemorySource {
    name: String,
    flags: Vec<Flag>,
    /// 1-based request number that fails with `Unavailable`.
    fail_on_request: Option<usize>,
    log: Mutex<RequestLog>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, mut flags: Vec<Flag>) -> Self {
        flags.sort_by_key(|f| f.timestamp);
        Self {
            name: name.into(),
            flags,
            fail_on_request: None,
            log: Mutex::new(RequestLog::default()),
        }
    }

    /// Fail the `n`th request (1-based) as if the endpoint were down.
    pub fn failing_on_request(mut self, n: usize) -> Self {
        self.fail_on_request = Some(n);
        self
    }

    /// Load a saved `{"data": {"flags": [...]}}` query response.
    pub fn from_response_file(name: impl Into<String>, path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", path.display())))?;
        let parsed: GraphQlResponse<FlagsData> =
            serde_json::from_str(&text).map_err(|e| SourceError::Decode(e.to_string()))?;
        let flags = parsed
            .data
            .map(|d| d.flags)
            .unwrap_or_default()
            .into_iter()
            .map(|w| w.into_flag())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, flags))
    }

    /// Cursors received so far, in request order.
    pub fn requested_cursors(&self) -> Vec<Timestamp> {
        self.log
            .lock()
            .map(|log| log.cursors.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requested_cursors().len()
    }
}

#[async_trait]
impl EventSource for MemorySource {
    async fn fetch_page(
        &self,
        since: Timestamp,
        page_size: usize,
    ) -> Result<Vec<Flag>, SourceError> {
        let request_number = {
            let mut log = self
                .log
                .lock()
                .map_err(|_| SourceError::Unavailable("request log poisoned".into()))?;
            log.cursors.push(since);
            log.cursors.len()
        };

        if self.fail_on_request == Some(request_number) {
            return Err(SourceError::Unavailable(format!(
                "injected failure on request {request_number}"
            )));
        }

        Ok(self
            .flags
            .iter()
            .filter(|f| f.timestamp > since)
            .take(page_size)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Hands every network the same in-memory source.
#[derive(Clone)]
pub struct MemoryConnector {
    source: Arc<MemorySource>,
}

impl MemoryConnector {
    pub fn new(source: Arc<MemorySource>) -> Self {
        Self { source }
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, _network: &NetworkConfig) -> Result<Arc<dyn EventSource>, SourceError> {
        Ok(self.source.clone())
    }
}
