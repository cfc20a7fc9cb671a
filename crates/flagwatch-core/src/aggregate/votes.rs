use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use flagwatch_shared::{Flag, Vote};

/// How repeated votes from the same voter are treated before tallying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteDedupe {
    /// Count every vote the source reports.
    KeepAll,
    /// One vote per voter: the one with the latest timestamp, ties going to
    /// the later entry in the sequence.
    #[default]
    LastTimestampWins,
}

impl VoteDedupe {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keep-all" | "keep_all" | "none" => Some(Self::KeepAll),
            "last-wins" | "last_wins" | "last-timestamp-wins" => Some(Self::LastTimestampWins),
            _ => None,
        }
    }

    /// The votes that count under this policy, in first-seen voter order.
    pub fn apply<'a>(&self, votes: &'a [Vote]) -> Vec<&'a Vote> {
        match self {
            Self::KeepAll => votes.iter().collect(),
            Self::LastTimestampWins => {
                let mut kept: Vec<&Vote> = Vec::with_capacity(votes.len());
                let mut slot: HashMap<&str, usize> = HashMap::new();
                for vote in votes {
                    match slot.get(vote.voter.id.as_str()) {
                        Some(&i) => {
                            if vote.timestamp >= kept[i].timestamp {
                                kept[i] = vote;
                            }
                        }
                        None => {
                            slot.insert(vote.voter.id.as_str(), kept.len());
                            kept.push(vote);
                        }
                    }
                }
                kept
            }
        }
    }
}

/// Kick / no-kick vote counts for one flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteSplit {
    pub kick: usize,
    pub no_kick: usize,
}

impl VoteSplit {
    pub fn of(flag: &Flag, policy: VoteDedupe) -> Self {
        policy
            .apply(&flag.votes)
            .into_iter()
            .fold(Self::default(), |mut split, vote| {
                if vote.voted_kick {
                    split.kick += 1;
                } else {
                    split.no_kick += 1;
                }
                split
            })
    }

    pub fn total(&self) -> usize {
        self.kick + self.no_kick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagwatch_shared::{Actor, Weight};

    fn vote(voter: &str, kick: bool, ts: i64) -> Vote {
        Vote {
            voter: Actor::new(voter),
            voted_kick: kick,
            weight: Weight::zero(),
            timestamp: ts,
        }
    }

    #[test]
    fn test_keep_all_counts_duplicates() {
        let votes = vec![vote("a", true, 1), vote("a", false, 2), vote("b", true, 3)];
        assert_eq!(VoteDedupe::KeepAll.apply(&votes).len(), 3);
    }

    #[test]
    fn test_last_timestamp_wins() {
        let votes = vec![
            vote("a", true, 5),
            vote("b", true, 3),
            vote("a", false, 9),
            vote("b", false, 1),
        ];
        let kept = VoteDedupe::LastTimestampWins.apply(&votes);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].voter.id, "a");
        assert!(!kept[0].voted_kick);
        assert_eq!(kept[1].voter.id, "b");
        assert!(kept[1].voted_kick);
    }

    #[test]
    fn test_tie_goes_to_later_entry() {
        let votes = vec![vote("a", true, 5), vote("a", false, 5)];
        let kept = VoteDedupe::LastTimestampWins.apply(&votes);
        assert_eq!(kept.len(), 1);
        assert!(!kept[0].voted_kick);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(VoteDedupe::parse("keep-all"), Some(VoteDedupe::KeepAll));
        assert_eq!(VoteDedupe::parse("LAST-WINS"), Some(VoteDedupe::LastTimestampWins));
        assert_eq!(VoteDedupe::parse("first-wins"), None);
        assert_eq!(VoteDedupe::default(), VoteDedupe::LastTimestampWins);
    }
}
