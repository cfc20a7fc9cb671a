use std::fmt;

use serde::{Serialize, Serializer};

use flagwatch_shared::{Flag, Weight};

use super::votes::VoteDedupe;

/// Weighted share of the vote in favour of kicking.
///
/// Both fields are rounded from the exact weight ratio: basis points feed
/// the numeric value, the whole percent feeds display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct KickFraction {
    basis_points: u32,
    percent: u32,
}

impl KickFraction {
    pub fn from_weights(for_kick: &Weight, against_kick: &Weight) -> Self {
        let total = for_kick.add(against_kick);
        Self {
            basis_points: Weight::ratio_basis_points(for_kick, &total),
            percent: Weight::ratio_percent(for_kick, &total),
        }
    }

    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }

    pub fn as_fraction(&self) -> f64 {
        f64::from(self.basis_points) / 10_000.0
    }

    /// Whole percent, rounded half-up.
    pub fn rounded_percent(&self) -> u32 {
        self.percent
    }
}

impl fmt::Display for KickFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.rounded_percent())
    }
}

impl Serialize for KickFraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_fraction())
    }
}

/// Weighted kick fraction of a flag.
///
/// Zero when no vote counts under `policy`. When the policy discarded
/// repeated votes the tallies are rebuilt from the surviving votes'
/// weights, otherwise the source's cumulative tallies are used.
pub fn kick_fraction(flag: &Flag, policy: VoteDedupe) -> KickFraction {
    let counted = policy.apply(&flag.votes);
    if counted.is_empty() {
        return KickFraction::default();
    }
    if counted.len() == flag.votes.len() {
        return KickFraction::from_weights(&flag.votes_for_kick, &flag.votes_against_kick);
    }

    let (for_kick, against_kick) =
        counted
            .iter()
            .fold((Weight::zero(), Weight::zero()), |(yes, no), vote| {
                if vote.voted_kick {
                    (yes.add(&vote.weight), no)
                } else {
                    (yes, no.add(&vote.weight))
                }
            });
    KickFraction::from_weights(&for_kick, &against_kick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagwatch_shared::{Actor, Vote};

    fn w(raw: &str) -> Weight {
        Weight::parse(raw).unwrap()
    }

    fn vote(voter: &str, kick: bool, weight: &str, ts: i64) -> Vote {
        Vote {
            voter: Actor::new(voter),
            voted_kick: kick,
            weight: w(weight),
            timestamp: ts,
        }
    }

    fn flag_with(votes: Vec<Vote>, for_kick: &str, against: &str) -> Flag {
        let mut flag = Flag::new("f", 1, Actor::new("a"), Actor::new("b"));
        flag.votes = votes;
        flag.votes_for_kick = w(for_kick);
        flag.votes_against_kick = w(against);
        flag
    }

    #[test]
    fn test_uses_source_tallies() {
        let flag = flag_with(
            vec![vote("v1", true, "1", 1), vote("v2", false, "1", 2)],
            "3000000000000000000",
            "1000000000000000000",
        );
        let frac = kick_fraction(&flag, VoteDedupe::LastTimestampWins);
        assert_eq!(frac.basis_points(), 7500);
        assert_eq!(frac.to_string(), "75%");
    }

    #[test]
    fn test_no_votes_is_zero() {
        let flag = flag_with(Vec::new(), "5", "0");
        assert_eq!(kick_fraction(&flag, VoteDedupe::KeepAll), KickFraction::default());
    }

    #[test]
    fn test_deduped_votes_rebuild_tallies() {
        let flag = flag_with(
            vec![
                vote("v1", true, "2000000000000000000", 1),
                vote("v1", false, "2000000000000000000", 5),
                vote("v2", true, "1000000000000000000", 3),
            ],
            "3000000000000000000",
            "2000000000000000000",
        );
        assert_eq!(kick_fraction(&flag, VoteDedupe::KeepAll).basis_points(), 6000);
        let deduped = kick_fraction(&flag, VoteDedupe::LastTimestampWins);
        assert_eq!(deduped.basis_points(), 3333);
        assert_eq!(deduped.to_string(), "33%");
    }

    #[test]
    fn test_rounding() {
        let frac = KickFraction::from_weights(&w("2"), &w("1"));
        assert_eq!(frac.basis_points(), 6667);
        assert_eq!(frac.rounded_percent(), 67);
        assert!((frac.as_fraction() - 0.6667).abs() < 1e-9);
    }

    #[test]
    fn test_percent_just_below_half_rounds_down() {
        let frac = KickFraction::from_weights(&w("99"), &w("19802"));
        assert_eq!(frac.basis_points(), 50);
        assert_eq!(frac.rounded_percent(), 0);
        assert_eq!(frac.to_string(), "0%");
    }
}
