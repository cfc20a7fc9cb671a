//! Derived views over an [`EventSet`].
//!
//! Every derivation is a pure function of the flag list and is rerun in
//! full whenever the set changes. Window sizes are bounded by the sweep's
//! day range, so no incremental bookkeeping is kept.

pub mod alignment;
pub mod daily;
pub mod kick;
pub mod ranking;
pub mod votes;

use serde::Serialize;

use flagwatch_shared::{FlagResult, Timestamp};

use crate::event_set::EventSet;

pub use alignment::{flag_alignment, vote_alignment};
pub use daily::{day_key, day_of, DailyBucket, DailyHistogram};
pub use kick::{kick_fraction, KickFraction};
pub use ranking::{rank_actors, top_actors, ActorRank, ActorRole};
pub use votes::{VoteDedupe, VoteSplit};

/// Per-flag scalars, in the same order as the event set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagMetrics {
    pub flag_id: String,
    pub timestamp: Timestamp,
    pub result: FlagResult,
    pub votes: VoteSplit,
    pub alignment: f64,
    pub kick_fraction: KickFraction,
}

impl FlagMetrics {
    /// Has a terminal outcome and belongs on outcome charts.
    pub fn is_terminal(&self) -> bool {
        !self.result.is_pending()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedViews {
    pub daily: DailyHistogram,
    pub flags: Vec<FlagMetrics>,
    pub flagger_ranking: Vec<ActorRank>,
    pub target_ranking: Vec<ActorRank>,
}

impl DerivedViews {
    pub fn compute(events: &EventSet, policy: VoteDedupe) -> Self {
        let flags = events.flags();
        let metrics = flags
            .iter()
            .map(|flag| {
                let votes = VoteSplit::of(flag, policy);
                FlagMetrics {
                    flag_id: flag.id.clone(),
                    timestamp: flag.timestamp,
                    result: flag.result.clone(),
                    votes,
                    alignment: vote_alignment(votes),
                    kick_fraction: kick_fraction(flag, policy),
                }
            })
            .collect();

        Self {
            daily: DailyHistogram::build(flags),
            flags: metrics,
            flagger_ranking: rank_actors(flags, ActorRole::Flagger),
            target_ranking: rank_actors(flags, ActorRole::Target),
        }
    }

    pub fn ranking(&self, role: ActorRole) -> &[ActorRank] {
        match role {
            ActorRole::Flagger => &self.flagger_ranking,
            ActorRole::Target => &self.target_ranking,
        }
    }

    /// The `k` most frequent actors in `role`.
    pub fn top(&self, role: ActorRole, k: usize) -> &[ActorRank] {
        let ranking = self.ranking(role);
        &ranking[..k.min(ranking.len())]
    }

    pub fn metrics(&self, flag_id: &str) -> Option<&FlagMetrics> {
        self.flags.iter().find(|m| m.flag_id == flag_id)
    }

    /// Metrics of flags with a terminal outcome, oldest first.
    pub fn terminal(&self) -> impl Iterator<Item = &FlagMetrics> {
        self.flags.iter().filter(|m| m.is_terminal())
    }
}
