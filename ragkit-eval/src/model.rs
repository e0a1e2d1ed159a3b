//! Data types shared by evaluators.

use std::collections::{BTreeMap, BTreeSet};

use ragkit_rag::SearchResult;
use serde::{Deserialize, Serialize};

/// A test query with ground truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenExample {
    /// The test query.
    pub query: String,
    /// Ids of the chunks that should be retrieved.
    pub relevant_doc_ids: BTreeSet<String>,
    /// The expected answer.
    pub reference_answer: String,
    /// Free-form labels (query type, source, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl GoldenExample {
    /// Create a golden example with no metadata.
    pub fn new<I, S>(
        query: impl Into<String>,
        relevant_doc_ids: I,
        reference_answer: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: query.into(),
            relevant_doc_ids: relevant_doc_ids.into_iter().map(Into::into).collect(),
            reference_answer: reference_answer.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The outcome of evaluating one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// The evaluated query.
    pub query: String,
    /// Retrieval quality metrics such as `recall@5` or `mrr`.
    #[serde(default)]
    pub retrieval_metrics: BTreeMap<String, f64>,
    /// Answer quality metrics such as `faithfulness`.
    #[serde(default)]
    pub generation_metrics: BTreeMap<String, f64>,
    /// Combined score.
    pub overall_score: f64,
    /// Evaluator-specific extras.
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl EvaluationResult {
    /// An empty result for `query` with an overall score of 0.
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    /// Look a metric up in the retrieval metrics, then the generation metrics.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.retrieval_metrics
            .get(name)
            .or_else(|| self.generation_metrics.get(name))
            .copied()
    }
}

/// One item of a batch evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalExample {
    /// The query that was asked.
    pub query: String,
    /// What the retrieval stage returned, best first.
    pub retrieved: Vec<SearchResult>,
    /// The answer produced from `retrieved`.
    pub generated_answer: String,
    /// Ground truth, when available.
    #[serde(default)]
    pub golden: Option<GoldenExample>,
}

impl EvalExample {
    /// Create a batch item without ground truth.
    pub fn new(
        query: impl Into<String>,
        retrieved: Vec<SearchResult>,
        generated_answer: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            retrieved,
            generated_answer: generated_answer.into(),
            golden: None,
        }
    }

    /// Attach ground truth.
    pub fn with_golden(mut self, golden: GoldenExample) -> Self {
        self.golden = Some(golden);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_example_deduplicates_relevant_ids() {
        let golden = GoldenExample::new("q", ["c1", "c2", "c1"], "answer").with_metadata("type", "factoid");
        assert_eq!(golden.relevant_doc_ids.len(), 2);
        assert_eq!(golden.metadata["type"], "factoid");
    }

    #[test]
    fn metric_lookup_checks_both_maps() {
        let mut result = EvaluationResult::new("q");
        result.retrieval_metrics.insert("mrr".into(), 0.5);
        result.generation_metrics.insert("relevance".into(), 1.0);
        assert_eq!(result.metric("mrr"), Some(0.5));
        assert_eq!(result.metric("relevance"), Some(1.0));
        assert_eq!(result.metric("missing"), None);
    }

    #[test]
    fn result_deserializes_with_missing_maps() {
        let result: EvaluationResult =
            serde_json::from_str(r#"{"query": "q", "overall_score": 0.25}"#).unwrap();
        assert_eq!(result.overall_score, 0.25);
        assert!(result.retrieval_metrics.is_empty());
    }
}
