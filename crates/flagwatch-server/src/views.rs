//! JSON shapes served to the dashboard front end.
//!
//! Everything here is a projection of one [`Snapshot`]; nothing is cached
//! between requests.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Serialize;

use flagwatch_core::aggregate::FlagMetrics;
use flagwatch_core::{ActorRank, ActorRole, SessionStatus, Snapshot};
use flagwatch_shared::{Actor, Flag, Timestamp, Vote};
use flagwatch_source::NetworkConfig;

fn iso_time(ts: Timestamp) -> Option<String> {
    DateTime::from_timestamp(ts, 0).map(|t| t.to_rfc3339())
}

#[derive(Debug, Serialize)]
pub struct ActorLink {
    pub id: String,
    pub name: String,
    pub link: String,
}

impl ActorLink {
    fn new(actor: &Actor, network: &NetworkConfig) -> Self {
        Self {
            id: actor.id.clone(),
            name: actor.display_name(),
            link: network.operator_link(&actor.id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoteDetail {
    pub voter: ActorLink,
    pub vote: &'static str,
    pub weight: String,
    pub timestamp: Timestamp,
    pub time: Option<String>,
}

impl VoteDetail {
    fn new(vote: &Vote, network: &NetworkConfig) -> Self {
        Self {
            voter: ActorLink::new(&vote.voter, network),
            vote: if vote.voted_kick { "Kick" } else { "NoKick" },
            weight: vote.weight.to_decimal_string(),
            timestamp: vote.timestamp,
            time: iso_time(vote.timestamp),
        }
    }
}

/// One row of the flag table.
#[derive(Debug, Serialize)]
pub struct FlagRow {
    pub id: String,
    pub timestamp: Timestamp,
    pub time: Option<String>,
    pub flagger: ActorLink,
    pub target: ActorLink,
    /// `votes cast / reviewers`, e.g. `3/5`.
    pub progress: String,
    pub result: String,
    pub result_label: String,
    pub result_class: Option<&'static str>,
    pub kick_fraction: f64,
    pub kick_percent: String,
    pub alignment: f64,
    pub sponsorship_link: Option<String>,
    pub votes: Vec<VoteDetail>,
}

impl FlagRow {
    fn new(flag: &Flag, metrics: &FlagMetrics, network: &NetworkConfig) -> Self {
        Self {
            id: flag.id.clone(),
            timestamp: flag.timestamp,
            time: iso_time(flag.timestamp),
            flagger: ActorLink::new(&flag.flagger, network),
            target: ActorLink::new(&flag.target, network),
            progress: format!("{}/{}", flag.votes.len(), flag.reviewer_count),
            result: flag.result.as_str().to_string(),
            result_label: flag.result.label().to_string(),
            result_class: flag.result.style_class(),
            kick_fraction: metrics.kick_fraction.as_fraction(),
            kick_percent: metrics.kick_fraction.to_string(),
            alignment: metrics.alignment,
            sponsorship_link: flag
                .sponsorship_id
                .as_deref()
                .map(|id| network.sponsorship_link(id)),
            votes: flag.votes.iter().map(|v| VoteDetail::new(v, network)).collect(),
        }
    }
}

/// Flag table, newest first.
pub fn flag_rows(snapshot: &Snapshot, network: &NetworkConfig) -> Vec<FlagRow> {
    snapshot
        .events
        .flags()
        .iter()
        .zip(snapshot.views.flags.iter())
        .rev()
        .map(|(flag, metrics)| FlagRow::new(flag, metrics, network))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct DailyRow {
    pub day: String,
    pub total: usize,
    pub results: BTreeMap<String, usize>,
    pub unique_flaggers: usize,
}

/// Stacked bar series for the per-day charts.
#[derive(Debug, Default, Serialize)]
pub struct DailySeries {
    pub labels: Vec<String>,
    pub failed: Vec<usize>,
    pub kicked: Vec<usize>,
    pub voting: Vec<usize>,
    pub unique_flaggers: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct DailyResponse {
    pub network: String,
    pub days: Vec<DailyRow>,
    pub series: DailySeries,
}

pub fn daily(snapshot: &Snapshot) -> DailyResponse {
    let mut days = Vec::with_capacity(snapshot.views.daily.len());
    let mut series = DailySeries::default();

    for (day, bucket) in snapshot.views.daily.iter() {
        series.labels.push(day.clone());
        series.failed.push(bucket.count("failed"));
        series.kicked.push(bucket.count("kicked"));
        series.voting.push(bucket.count("voting"));
        series.unique_flaggers.push(bucket.unique_flaggers());
        days.push(DailyRow {
            day,
            total: bucket.total,
            results: bucket.result_counts.clone(),
            unique_flaggers: bucket.unique_flaggers(),
        });
    }

    DailyResponse {
        network: snapshot.network.clone(),
        days,
        series,
    }
}

#[derive(Debug, Serialize)]
pub struct AlignmentPoint {
    pub flag_id: String,
    pub timestamp: Timestamp,
    pub alignment: f64,
}

/// Vote alignment of every flag with a terminal outcome, oldest first.
pub fn alignment(snapshot: &Snapshot) -> Vec<AlignmentPoint> {
    snapshot
        .views
        .terminal()
        .map(|m| AlignmentPoint {
            flag_id: m.flag_id.clone(),
            timestamp: m.timestamp,
            alignment: m.alignment,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct VotePoint {
    pub flag_id: String,
    pub timestamp: Timestamp,
    pub kick: usize,
    pub no_kick: usize,
}

pub fn votes(snapshot: &Snapshot) -> Vec<VotePoint> {
    snapshot
        .views
        .terminal()
        .map(|m| VotePoint {
            flag_id: m.flag_id.clone(),
            timestamp: m.timestamp,
            kick: m.votes.kick,
            no_kick: m.votes.no_kick,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct RankRow {
    pub actor: ActorLink,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RankingResponse {
    pub network: String,
    pub role: ActorRole,
    pub k: usize,
    pub ranks: Vec<RankRow>,
}

pub fn ranking(
    snapshot: &Snapshot,
    network: &NetworkConfig,
    role: ActorRole,
    k: usize,
) -> RankingResponse {
    let ranks = snapshot
        .views
        .top(role, k)
        .iter()
        .map(|rank: &ActorRank| RankRow {
            actor: ActorLink {
                id: rank.actor_id.clone(),
                name: rank.display_name.clone(),
                link: network.operator_link(&rank.actor_id),
            },
            count: rank.count,
        })
        .collect();

    RankingResponse {
        network: snapshot.network.clone(),
        role,
        k,
        ranks,
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse<'a> {
    pub network: &'a str,
    pub title: &'a str,
    pub generation: u64,
    #[serde(flatten)]
    pub status: &'a SessionStatus,
}

pub fn status<'a>(snapshot: &'a Snapshot, network: &'a NetworkConfig) -> StatusResponse<'a> {
    StatusResponse {
        network: &snapshot.network,
        title: &network.title,
        generation: snapshot.generation,
        status: &snapshot.status,
    }
}
