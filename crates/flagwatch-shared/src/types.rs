use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::RecordError;
use crate::weight::Weight;

/// Seconds since the Unix epoch, as reported by the subgraph.
pub type Timestamp = i64;

/// A network participant (operator) referenced by a flag or vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    /// Raw `metadataJsonString`, usually `{"name": "..."}`.
    pub metadata_json: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata_json: None,
        }
    }

    pub fn with_metadata(id: impl Into<String>, metadata_json: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata_json: Some(metadata_json.into()),
        }
    }

    /// Human-readable name from the metadata JSON, or the raw id when the
    /// metadata is absent, unparsable, or has no string `name`.
    pub fn display_name(&self) -> String {
        let Some(raw) = self.metadata_json.as_deref() else {
            return self.id.clone();
        };
        match metadata_name(raw) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(actor = %self.id, error = %e, "Using id as display name");
                self.id.clone()
            }
        }
    }
}

fn metadata_name(raw: &str) -> Result<String, RecordError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    value
        .get("name")
        .and_then(|n| n.as_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or(RecordError::MissingName)
}

/// A single reviewer's vote on a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub voter: Actor,
    pub voted_kick: bool,
    pub weight: Weight,
    pub timestamp: Timestamp,
}

/// Outcome tag of a flag. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlagResult {
    Voting,
    Waiting,
    Kicked,
    Failed,
    Other(String),
}

impl FlagResult {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "voting" => Self::Voting,
            "waiting" => Self::Waiting,
            "kicked" => Self::Kicked,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Voting => "voting",
            Self::Waiting => "waiting",
            Self::Kicked => "kicked",
            Self::Failed => "failed",
            Self::Other(tag) => tag,
        }
    }

    /// Still awaiting votes; excluded from terminal-outcome charts.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Voting | Self::Waiting)
    }

    /// Label shown in the flag table.
    pub fn label(&self) -> &str {
        match self {
            Self::Failed => "not kicked",
            other => other.as_str(),
        }
    }

    /// CSS class used by the flag table, if any.
    pub fn style_class(&self) -> Option<&'static str> {
        match self {
            Self::Kicked => Some("kick"),
            Self::Failed => Some("nokick"),
            _ => None,
        }
    }
}

impl fmt::Display for FlagResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FlagResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A misbehaviour report and the votes cast on it. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub id: String,
    pub timestamp: Timestamp,
    pub flagger: Actor,
    pub target: Actor,
    /// Ids of reviewers eligible to vote, when the source reports them.
    pub reviewer_ids: BTreeSet<String>,
    pub reviewer_count: u32,
    pub votes: Vec<Vote>,
    pub result: FlagResult,
    pub votes_for_kick: Weight,
    pub votes_against_kick: Weight,
    pub sponsorship_id: Option<String>,
    pub metadata: Option<String>,
}

impl Flag {
    /// Minimal flag, used as a starting point by adapters and tests.
    pub fn new(id: impl Into<String>, timestamp: Timestamp, flagger: Actor, target: Actor) -> Self {
        Self {
            id: id.into(),
            timestamp,
            flagger,
            target,
            reviewer_ids: BTreeSet::new(),
            reviewer_count: 0,
            votes: Vec::new(),
            result: FlagResult::Voting,
            votes_for_kick: Weight::zero(),
            votes_against_kick: Weight::zero(),
            sponsorship_id: None,
            metadata: None,
        }
    }
}
