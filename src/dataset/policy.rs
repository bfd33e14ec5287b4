//! Reveal policies
//!
//! A reveal policy decides how many of the cards a holder could show are
//! actually shown. The decision depends only on the policy, the refutable
//! cards, and how many suggestions the holder has seen so far.

use serde::{Deserialize, Serialize};

/// How much of a truthful answer to disclose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealPolicy {
    /// Reveal every refutable card
    Cooperative,
    /// Reveal only the first refutable card
    Competitive,
    /// One card alone is revealed; two only late in the game; never more than two
    #[default]
    Balanced,
    /// Loosens as the suggestion count grows
    Progressive,
}

/// Suggestion count above which Balanced reveals a pair
const BALANCED_PAIR_AFTER: usize = 4;

/// Balanced never reveals more than this many cards at once
const BALANCED_MAX: usize = 2;

impl RevealPolicy {
    /// Wire name of this policy
    pub fn as_str(self) -> &'static str {
        match self {
            RevealPolicy::Cooperative => "cooperative",
            RevealPolicy::Competitive => "competitive",
            RevealPolicy::Balanced => "balanced",
            RevealPolicy::Progressive => "progressive",
        }
    }
}

impl std::fmt::Display for RevealPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progressive stage for a suggestion count: 1 below three, 2 up to five, 3 after
pub fn progressive_stage(suggestion_count: usize) -> usize {
    match suggestion_count {
        0..=2 => 1,
        3..=5 => 2,
        _ => 3,
    }
}

/// Pick which refutable cards to reveal
///
/// Pure: the result is a prefix of `refutable`, and is empty only when
/// `refutable` is.
pub fn apply_revelation_strategy(
    policy: RevealPolicy,
    refutable: &[String],
    suggestion_count: usize,
) -> Vec<String> {
    let take = match policy {
        RevealPolicy::Cooperative => refutable.len(),
        RevealPolicy::Competitive => 1,
        RevealPolicy::Progressive => match progressive_stage(suggestion_count) {
            1 => 1,
            2 => 2,
            _ => refutable.len(),
        },
        RevealPolicy::Balanced => match refutable.len() {
            2 if suggestion_count > BALANCED_PAIR_AFTER => 2,
            2 => 1,
            n => n.min(BALANCED_MAX),
        },
    };

    refutable.iter().take(take).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_refutable_reveals_nothing() {
        for policy in [
            RevealPolicy::Cooperative,
            RevealPolicy::Competitive,
            RevealPolicy::Balanced,
            RevealPolicy::Progressive,
        ] {
            assert!(apply_revelation_strategy(policy, &[], 10).is_empty());
        }
    }

    #[test]
    fn test_cooperative_reveals_all() {
        let refutable = cards(&["Colonel Mustard", "Knife", "Library"]);
        assert_eq!(
            apply_revelation_strategy(RevealPolicy::Cooperative, &refutable, 1),
            refutable
        );
    }

    #[test]
    fn test_competitive_reveals_first_only() {
        let refutable = cards(&["Knife", "Library"]);
        assert_eq!(
            apply_revelation_strategy(RevealPolicy::Competitive, &refutable, 50),
            cards(&["Knife"])
        );
    }

    #[test]
    fn test_balanced_thresholds() {
        let one = cards(&["Knife"]);
        let two = cards(&["Knife", "Library"]);
        let three = cards(&["Colonel Mustard", "Knife", "Library"]);

        assert_eq!(apply_revelation_strategy(RevealPolicy::Balanced, &one, 1).len(), 1);
        assert_eq!(apply_revelation_strategy(RevealPolicy::Balanced, &two, 2).len(), 1);
        assert_eq!(apply_revelation_strategy(RevealPolicy::Balanced, &two, 4).len(), 1);
        assert_eq!(apply_revelation_strategy(RevealPolicy::Balanced, &two, 5).len(), 2);
        assert_eq!(apply_revelation_strategy(RevealPolicy::Balanced, &three, 1).len(), 2);
        assert_eq!(apply_revelation_strategy(RevealPolicy::Balanced, &three, 9).len(), 2);
    }

    #[test]
    fn test_progressive_thresholds() {
        let three = cards(&["Colonel Mustard", "Knife", "Library"]);

        assert_eq!(apply_revelation_strategy(RevealPolicy::Progressive, &three, 2).len(), 1);
        assert_eq!(apply_revelation_strategy(RevealPolicy::Progressive, &three, 3).len(), 2);
        assert_eq!(apply_revelation_strategy(RevealPolicy::Progressive, &three, 5).len(), 2);
        assert_eq!(apply_revelation_strategy(RevealPolicy::Progressive, &three, 6).len(), 3);
    }

    #[test]
    fn test_progressive_stage() {
        assert_eq!(progressive_stage(0), 1);
        assert_eq!(progressive_stage(2), 1);
        assert_eq!(progressive_stage(3), 2);
        assert_eq!(progressive_stage(5), 2);
        assert_eq!(progressive_stage(6), 3);
    }

    #[test]
    fn test_policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&RevealPolicy::Progressive).unwrap(),
            "\"progressive\""
        );
        let parsed: RevealPolicy = serde_json::from_str("\"competitive\"").unwrap();
        assert_eq!(parsed, RevealPolicy::Competitive);
        assert_eq!(RevealPolicy::default(), RevealPolicy::Balanced);
    }
}
