use flagwatch_shared::Flag;

use super::votes::{VoteDedupe, VoteSplit};

/// Share of votes on the majority side, whichever side that is.
///
/// Lies in `[0.5, 1]` when there are votes and is `0` when there are none.
pub fn vote_alignment(split: VoteSplit) -> f64 {
    let total = split.total();
    if total == 0 {
        return 0.0;
    }
    split.kick.max(split.no_kick) as f64 / total as f64
}

pub fn flag_alignment(flag: &Flag, policy: VoteDedupe) -> f64 {
    vote_alignment(VoteSplit::of(flag, policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_of_three() {
        let a = vote_alignment(VoteSplit { kick: 2, no_kick: 1 });
        assert!((a - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_direction_does_not_matter() {
        assert_eq!(
            vote_alignment(VoteSplit { kick: 4, no_kick: 1 }),
            vote_alignment(VoteSplit { kick: 1, no_kick: 4 })
        );
    }

    #[test]
    fn test_edges() {
        assert_eq!(vote_alignment(VoteSplit::default()), 0.0);
        assert_eq!(vote_alignment(VoteSplit { kick: 3, no_kick: 3 }), 0.5);
        assert_eq!(vote_alignment(VoteSplit { kick: 0, no_kick: 5 }), 1.0);
    }
}
