//! Ranking metrics over a retrieved id list and a ground-truth set.
//!
//! | Metric | Description |
//! |--------|-------------|
//! | R@k | Fraction of relevant ids found in the top k |
//! | P@k | Fraction of the top k that is relevant |
//! | MRR | Reciprocal rank of the first relevant id |
//!
//! Retrieved ids are counted once each, so a duplicated id in the top k
//! cannot push recall or precision past the true value.

use std::collections::{BTreeSet, HashSet};

fn relevant_in_top_k<S: AsRef<str>>(retrieved: &[S], relevant: &BTreeSet<String>, k: usize) -> usize {
    let top_k: HashSet<&str> = retrieved.iter().take(k).map(AsRef::as_ref).collect();
    top_k.into_iter().filter(|id| relevant.contains(*id)).count()
}

/// Computes Recall@k.
///
/// ```text
/// R@k = |relevant ∩ top_k| / |relevant|
/// ```
///
/// Returns 0.0 when `relevant` is empty.
pub fn recall_at_k<S: AsRef<str>>(retrieved: &[S], relevant: &BTreeSet<String>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    relevant_in_top_k(retrieved, relevant, k) as f64 / relevant.len() as f64
}

/// Computes Precision@k.
///
/// ```text
/// P@k = |relevant ∩ top_k| / k
/// ```
///
/// The denominator is `k` even when fewer than `k` ids were retrieved.
/// Returns 0.0 when `k` is 0.
pub fn precision_at_k<S: AsRef<str>>(retrieved: &[S], relevant: &BTreeSet<String>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    relevant_in_top_k(retrieved, relevant, k) as f64 / k as f64
}

/// Computes the reciprocal rank of the first relevant id.
///
/// Ranks are 1-based over the whole list. Returns 0.0 when no retrieved id is
/// relevant. Averaged over queries this is MRR.
pub fn mrr<S: AsRef<str>>(retrieved: &[S], relevant: &BTreeSet<String>) -> f64 {
    retrieved
        .iter()
        .position(|id| relevant.contains(id.as_ref()))
        .map_or(0.0, |index| 1.0 / (index + 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reference_scenario() {
        let retrieved = ["c3", "c1", "c5"];
        let relevant = set(&["c1", "c2"]);
        assert_eq!(recall_at_k(&retrieved, &relevant, 5), 0.5);
        assert_eq!(precision_at_k(&retrieved, &relevant, 5), 0.2);
        assert_eq!(mrr(&retrieved, &relevant), 0.5);
    }

    #[test]
    fn empty_relevant_set_scores_zero() {
        let retrieved = ["a", "b"];
        assert_eq!(recall_at_k(&retrieved, &BTreeSet::new(), 5), 0.0);
        assert_eq!(precision_at_k(&retrieved, &BTreeSet::new(), 5), 0.0);
        assert_eq!(mrr(&retrieved, &BTreeSet::new()), 0.0);
    }

    #[test]
    fn zero_cutoff() {
        let relevant = set(&["a"]);
        assert_eq!(precision_at_k(&["a"], &relevant, 0), 0.0);
        assert_eq!(recall_at_k(&["a"], &relevant, 0), 0.0);
    }

    #[test]
    fn duplicates_count_once() {
        let relevant = set(&["a", "b"]);
        assert_eq!(recall_at_k(&["a", "a", "a"], &relevant, 3), 0.5);
        assert!((precision_at_k(&["a", "a", "a"], &relevant, 3) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn mrr_is_one_when_first_is_relevant() {
        let relevant = set(&["x"]);
        assert_eq!(mrr(&["x", "y"], &relevant), 1.0);
        assert_eq!(mrr(&["y", "z", "x"], &relevant), 1.0 / 3.0);
        assert_eq!(mrr::<&str>(&[], &relevant), 0.0);
    }
}
