//! Raw subgraph response shapes and their conversion into domain types.
//!
//! The subgraph encodes `BigInt` fields as strings and `Int` fields as JSON
//! numbers, so every integer here is accepted in either form.

use std::collections::BTreeSet;

use serde::Deserialize;

use flagwatch_shared::{Actor, Flag, FlagResult, RecordError, Timestamp, Vote, Weight};

use crate::source::SourceError;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct FlagsData {
    pub flags: Vec<WireFlag>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireInt {
    Int(i64),
    Text(String),
}

impl WireInt {
    pub fn to_i64(&self) -> Result<i64, RecordError> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| RecordError::InvalidInteger(s.clone())),
        }
    }

    fn to_weight(&self) -> Weight {
        match self {
            Self::Int(n) if *n >= 0 => Weight::parse_or_zero(&n.to_string()),
            Self::Int(_) => Weight::zero(),
            Self::Text(s) => Weight::parse_or_zero(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireId {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireActor {
    pub id: String,
    #[serde(default)]
    pub metadata_json_string: Option<String>,
}

impl From<WireActor> for Actor {
    fn from(wire: WireActor) -> Self {
        Actor {
            id: wire.id,
            metadata_json: wire.metadata_json_string.filter(|m| !m.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireVote {
    pub voter: WireActor,
    #[serde(default)]
    pub voted_kick: bool,
    #[serde(default)]
    pub voter_weight: Option<WireInt>,
    #[serde(default)]
    pub timestamp: Option<WireInt>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFlag {
    pub id: String,
    pub flagging_timestamp: WireInt,
    pub flagger: WireActor,
    pub target: WireActor,
    #[serde(default)]
    pub reviewer_count: Option<WireInt>,
    #[serde(default)]
    pub reviewers: Option<Vec<WireId>>,
    #[serde(default)]
    pub votes: Vec<WireVote>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub votes_for_kick: Option<WireInt>,
    #[serde(default)]
    pub votes_against_kick: Option<WireInt>,
    #[serde(default)]
    pub sponsorship: Option<WireId>,
    #[serde(default)]
    pub metadata: Option<String>,
}

impl WireFlag {
    /// Convert into a domain flag.
    ///
    /// The flagging timestamp is the pagination cursor, so an unparsable
    /// one fails the whole page. Every other field degrades to a fallback.
    pub fn into_flag(self) -> Result<Flag, SourceError> {
        let timestamp = self.flagging_timestamp.to_i64().map_err(|e| {
            SourceError::Decode(format!("flag {}: flaggingTimestamp: {e}", self.id))
        })?;

        let votes = self
            .votes
            .into_iter()
            .map(|v| Vote {
                voter: v.voter.into(),
                voted_kick: v.voted_kick,
                weight: v.voter_weight.as_ref().map(WireInt::to_weight).unwrap_or_default(),
                timestamp: v
                    .timestamp
                    .as_ref()
                    .map(|t| lenient_i64(t, "vote.timestamp"))
                    .unwrap_or_default(),
            })
            .collect();

        let reviewer_count = self
            .reviewer_count
            .as_ref()
            .map(|c| u32::try_from(lenient_i64(c, "reviewerCount")).unwrap_or(0))
            .unwrap_or(0);

        let reviewer_ids: BTreeSet<String> = self
            .reviewers
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.id)
            .collect();

        Ok(Flag {
            id: self.id,
            timestamp,
            flagger: self.flagger.into(),
            target: self.target.into(),
            reviewer_ids,
            reviewer_count,
            votes,
            result: FlagResult::parse(self.result.as_deref().unwrap_or("voting")),
            votes_for_kick: self.votes_for_kick.as_ref().map(WireInt::to_weight).unwrap_or_default(),
            votes_against_kick: self
                .votes_against_kick
                .as_ref()
                .map(WireInt::to_weight)
                .unwrap_or_default(),
            sponsorship_id: self.sponsorship.map(|s| s.id),
            metadata: self.metadata,
        })
    }
}

fn lenient_i64(value: &WireInt, field: &str) -> Timestamp {
    value.to_i64().unwrap_or_else(|e| {
        tracing::debug!(field, error = %e, "Falling back to zero");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": {
            "flags": [{
                "id": "0xsp-0xtarget-1",
                "flaggingTimestamp": "1700000100",
                "flagger": { "id": "0xf1", "metadataJsonString": "{\"name\":\"Flagger One\"}" },
                "target": { "id": "0xt1", "metadataJsonString": "" },
                "reviewerCount": 3,
                "votes": [
                    { "voter": { "id": "0xv1" }, "votedKick": true, "voterWeight": "2000000000000000000", "timestamp": "1700000200" },
                    { "voter": { "id": "0xv2" }, "votedKick": false, "voterWeight": "garbage", "timestamp": "1700000300" }
                ],
                "result": "kicked",
                "votesForKick": "2000000000000000000",
                "votesAgainstKick": "1000000000000000000",
                "sponsorship": { "id": "0xsp" },
                "metadata": ""
            }]
        }
    }"#;

    #[test]
    fn test_decode_sample_page() {
        let resp: GraphQlResponse<FlagsData> = serde_json::from_str(SAMPLE).unwrap();
        assert!(resp.errors.is_empty());
        let wire = resp.data.unwrap().flags.into_iter().next().unwrap();
        let flag = wire.into_flag().unwrap();

        assert_eq!(flag.timestamp, 1_700_000_100);
        assert_eq!(flag.flagger.display_name(), "Flagger One");
        assert_eq!(flag.target.metadata_json, None);
        assert_eq!(flag.reviewer_count, 3);
        assert_eq!(flag.votes.len(), 2);
        assert!(flag.votes[0].voted_kick);
        assert_eq!(flag.votes[0].timestamp, 1_700_000_200);
        assert!(flag.votes[1].weight.is_zero());
        assert_eq!(flag.result, FlagResult::Kicked);
        assert_eq!(flag.votes_for_kick.to_decimal_string(), "2");
        assert_eq!(flag.sponsorship_id.as_deref(), Some("0xsp"));
    }

    #[test]
    fn test_bad_timestamp_fails_page() {
        let wire: WireFlag = serde_json::from_str(
            r#"{"id":"x","flaggingTimestamp":"soon","flagger":{"id":"a"},"target":{"id":"b"}}"#,
        )
        .unwrap();
        assert!(matches!(wire.into_flag(), Err(SourceError::Decode(_))));
    }

    #[test]
    fn test_missing_optionals_default() {
        let wire: WireFlag = serde_json::from_str(
            r#"{"id":"x","flaggingTimestamp":42,"flagger":{"id":"a"},"target":{"id":"b"},"result":"somethingNew"}"#,
        )
        .unwrap();
        let flag = wire.into_flag().unwrap();
        assert_eq!(flag.timestamp, 42);
        assert!(flag.votes.is_empty());
        assert_eq!(flag.result.as_str(), "somethingNew");
        assert!(flag.votes_for_kick.is_zero());
        assert_eq!(flag.sponsorship_id, None);
    }

    #[test]
    fn test_graphql_errors_decode() {
        let resp: GraphQlResponse<FlagsData> =
            serde_json::from_str(r#"{"errors":[{"message":"indexing error"}]}"#).unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors[0].message, "indexing error");
    }
}
