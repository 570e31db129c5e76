//! Incremental dedup-merge of a freshly scraped session into the persisted log.
//!
//! New records go in front of the baseline, most recently encountered first:
//! `merge([X, Y], [A, B]) == [B, A, X, Y]`. The baseline keeps its order and
//! is never modified. Identity is [`Tweet::signature`].

use crate::tweet::{Signature, Tweet};
use std::collections::HashSet;

/// Set of signatures already accounted for.
///
/// Owned by whoever is deduplicating; there is no process-wide state.
#[derive(Debug, Clone, Default)]
pub struct MergeState {
    seen: HashSet<Signature>,
}

impl MergeState {
    /// Seed the seen set with every record of `baseline`.
    pub fn from_baseline(baseline: &[Tweet]) -> Self {
        Self {
            seen: baseline.iter().map(Tweet::signature).collect(),
        }
    }

    /// Mark `tweet` as seen. Returns `true` the first time a signature shows up.
    pub fn observe(&mut self, tweet: &Tweet) -> bool {
        self.seen.insert(tweet.signature())
    }
}

/// Output of [`merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub log: Vec<Tweet>,
    /// Records from `incoming` that were not already present.
    pub inserted: usize,
}

/// Merge `incoming` into `baseline`.
///
/// Only the first occurrence of a signature in `incoming` survives, and
/// nothing already in `baseline` is inserted again.
pub fn merge(baseline: &[Tweet], incoming: &[Tweet]) -> MergeOutcome {
    let mut state = MergeState::from_baseline(baseline);
    merge_with_state(&mut state, baseline, incoming)
}

/// [`merge`] against a caller-held seen set, which is updated in place.
///
/// `state` must already cover `baseline`.
pub fn merge_with_state(
    state: &mut MergeState,
    baseline: &[Tweet],
    incoming: &[Tweet],
) -> MergeOutcome {
    let fresh: Vec<&Tweet> = incoming.iter().filter(|t| state.observe(t)).collect();
    let inserted = fresh.len();

    let mut log = Vec::with_capacity(inserted + baseline.len());
    log.extend(fresh.into_iter().rev().cloned());
    log.extend_from_slice(baseline);

    MergeOutcome { log, inserted }
}

/// Drop repeated signatures, keeping first occurrences in order.
pub fn dedup(tweets: impl IntoIterator<Item = Tweet>) -> Vec<Tweet> {
    let mut state = MergeState::default();
    tweets.into_iter().filter(|t| state.observe(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(u: &str, ts: &str, x: &str) -> Tweet {
        Tweet::new(u, ts, x)
    }

    #[test]
    fn empty_incoming_leaves_baseline_untouched() {
        let baseline = vec![t("X", "1", "x"), t("Y", "2", "y")];
        let outcome = merge(&baseline, &[]);
        assert_eq!(outcome.log, baseline);
        assert_eq!(outcome.inserted, 0);
    }

    #[test]
    fn both_empty() {
        assert_eq!(merge(&[], &[]), MergeOutcome::default());
    }

    #[test]
    fn duplicates_within_incoming_collapse() {
        let a = t("A", "1", "a");
        let outcome = merge(&[], &[a.clone(), a.clone()]);
        assert_eq!(outcome.log, vec![a]);
        assert_eq!(outcome.inserted, 1);
    }

    #[test]
    fn new_records_are_prepended_in_reverse_encounter_order() {
        let (x, y) = (t("X", "1", "x"), t("Y", "2", "y"));
        let (a, b) = (t("A", "3", "a"), t("B", "4", "b"));
        let outcome = merge(&[x.clone(), y.clone()], &[a.clone(), b.clone()]);
        assert_eq!(outcome.log, vec![b, a, x, y]);
        assert_eq!(outcome.inserted, 2);
    }

    #[test]
    fn empty_baseline_gives_reversed_dedup_incoming() {
        let (a, b, c) = (t("A", "1", "a"), t("B", "2", "b"), t("C", "3", "c"));
        let outcome = merge(&[], &[a.clone(), b.clone(), a.clone(), c.clone()]);
        assert_eq!(outcome.log, vec![c, b, a]);
        assert_eq!(outcome.inserted, 3);
    }

    #[test]
    fn timestamp_difference_makes_records_distinct() {
        let old = t("Alice", "2024-01-01T00:00:00Z", "hi");
        let new = t("Alice", "2024-01-02T00:00:00Z", "hi");
        let outcome = merge(&[old.clone()], &[new.clone()]);
        assert_eq!(outcome.log, vec![new, old]);
        assert_eq!(outcome.inserted, 1);
    }

    #[test]
    fn incoming_duplicate_of_baseline_is_skipped() {
        let alice = t("Alice", "2024-01-01T00:00:00Z", "hi");
        let bob = t("Bob", "2024-01-02T00:00:00Z", "yo");
        let outcome = merge(&[alice.clone()], &[bob.clone(), alice.clone()]);
        assert_eq!(outcome.log, vec![bob, alice]);
        assert_eq!(outcome.inserted, 1);
    }

    #[test]
    fn remerging_the_same_session_is_idempotent() {
        let baseline = vec![t("X", "1", "x")];
        let incoming = vec![t("A", "2", "a"), t("B", "3", "b")];
        let first = merge(&baseline, &incoming);
        let second = merge(&first.log, &incoming);
        assert_eq!(second.log, first.log);
        assert_eq!(second.inserted, 0);
    }

    #[test]
    fn shared_state_carries_across_batches() {
        let mut state = MergeState::default();
        let a = t("A", "1", "a");
        let first = merge_with_state(&mut state, &[], &[a.clone()]);
        let second = merge_with_state(&mut state, &first.log, &[a.clone(), t("B", "2", "b")]);
        assert_eq!(second.inserted, 1);
        // Both signatures are now known to the caller's state.
        assert!(!state.observe(&a));
        assert!(!state.observe(&t("B", "2", "b")));
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let (a, b) = (t("A", "1", "a"), t("B", "2", "b"));
        assert_eq!(dedup(vec![a.clone(), b.clone(), a.clone()]), vec![a, b]);
    }
}
