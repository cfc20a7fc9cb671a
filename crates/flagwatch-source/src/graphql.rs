//! GraphQL event source over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use flagwatch_shared::{Flag, Timestamp};

use crate::registry::NetworkConfig;
use crate::source::{Connector, EventSource, SourceError};
use crate::wire::{FlagsData, GraphQlResponse};

/// Flags strictly after `$since`, oldest first.
pub const FLAGS_QUERY: &str = r#"
query Flags($since: BigInt!, $first: Int!) {
  flags(
    first: $first
    orderBy: flaggingTimestamp
    orderDirection: asc
    where: { flaggingTimestamp_gt: $since }
  ) {
    id
    flaggingTimestamp
    flagger {
      id
      metadataJsonString
    }
    target {
      id
      metadataJsonString
    }
    reviewers {
      id
    }
    reviewerCount
    metadata
    votesForKick
    votesAgainstKick
    votes {
      voter {
        id
        metadataJsonString
      }
      timestamp
      votedKick
      voterWeight
    }
    result
    sponsorship {
      id
    }
  }
}
"#;

/// Queries one subgraph endpoint. No caching, no retries.
pub struct GraphQlSource {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GraphQlSource {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl EventSource for GraphQlSource {
    async fn fetch_page(
        &self,
        since: Timestamp,
        page_size: usize,
    ) -> Result<Vec<Flag>, SourceError> {
        let body = serde_json::json!({
            "query": FLAGS_QUERY,
            "variables": {
                "since": since.to_string(),
                "first": page_size,
            },
        });

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let text = resp.text().await?;
        let parsed: GraphQlResponse<FlagsData> =
            serde_json::from_str(&text).map_err(|e| SourceError::Decode(e.to_string()))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(SourceError::GraphQl(messages.join("; ")));
        }

        let data = parsed
            .data
            .ok_or_else(|| SourceError::Decode("response has no data".into()))?;

        let flags = data
            .flags
            .into_iter()
            .map(|wire| wire.into_flag())
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            network = %self.name,
            since,
            page_size,
            returned = flags.len(),
            "Fetched flag page"
        );

        Ok(flags)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Connects a [`GraphQlSource`] to a network's query endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlConnector {
    pub timeout: Duration,
}

impl Connector for GraphQlConnector {
    fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn EventSource>, SourceError> {
        let source = GraphQlSource::new(&network.name, &network.graph_url, self.timeout)?;
        Ok(Arc::new(source))
    }
}
