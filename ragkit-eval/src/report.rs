//! Aggregation of batch results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::EvaluationResult;

/// Mean metrics over a batch of [`EvaluationResult`]s.
///
/// Each metric is averaged over the results that report it, so a metric that
/// only some queries produce (for example `correctness`) is not diluted by
/// the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Number of results summarized.
    pub count: usize,
    /// Mean of `overall_score`, 0 for an empty batch.
    pub mean_overall_score: f64,
    /// Mean of each retrieval metric.
    pub retrieval_metrics: BTreeMap<String, f64>,
    /// Mean of each generation metric.
    pub generation_metrics: BTreeMap<String, f64>,
}

fn mean_by_key<'a>(maps: impl Iterator<Item = &'a BTreeMap<String, f64>>) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for map in maps {
        for (name, value) in map {
            let entry = totals.entry(name.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    totals.into_iter().map(|(name, (sum, n))| (name, sum / n as f64)).collect()
}

impl EvaluationSummary {
    /// Summarize `results`.
    pub fn from_results(results: &[EvaluationResult]) -> Self {
        let count = results.len();
        let mean_overall_score = if count == 0 {
            0.0
        } else {
            results.iter().map(|r| r.overall_score).sum::<f64>() / count as f64
        };
        let summary = Self {
            count,
            mean_overall_score,
            retrieval_metrics: mean_by_key(results.iter().map(|r| &r.retrieval_metrics)),
            generation_metrics: mean_by_key(results.iter().map(|r| &r.generation_metrics)),
        };
        info!(count, mean_overall_score, "evaluation summary");
        summary
    }
}
