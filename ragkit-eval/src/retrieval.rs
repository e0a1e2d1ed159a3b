//! Retrieval-quality evaluator.

use async_trait::async_trait;
use ragkit_rag::SearchResult;
use tracing::debug;

use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::metrics::{mrr, precision_at_k, recall_at_k};
use crate::model::{EvaluationResult, GoldenExample};

/// Scores the retrieved chunk ids against `golden.relevant_doc_ids`.
///
/// Produces `recall@{k}` for each recall cutoff, `precision@{k}` for each
/// precision cutoff, and `mrr`. The overall score is recall at the first
/// recall cutoff. Without ground truth (or with an empty relevant set) no
/// metrics are produced and the overall score is 0.
///
/// The default cutoffs yield `recall@5`, `recall@10`, `precision@5` and `mrr`.
#[derive(Debug, Clone)]
pub struct RetrievalEvaluator {
    recall_cutoffs: Vec<usize>,
    precision_cutoffs: Vec<usize>,
}

impl Default for RetrievalEvaluator {
    fn default() -> Self {
        Self { recall_cutoffs: vec![5, 10], precision_cutoffs: vec![5] }
    }
}

impl RetrievalEvaluator {
    /// Create an evaluator with custom cutoffs.
    ///
    /// The first recall cutoff is the primary one used for the overall score.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigError`] if `recall_cutoffs` is empty or any
    /// cutoff is zero.
    pub fn new(recall_cutoffs: Vec<usize>, precision_cutoffs: Vec<usize>) -> Result<Self> {
        if recall_cutoffs.is_empty() {
            return Err(EvalError::ConfigError("at least one recall cutoff is required".to_string()));
        }
        if recall_cutoffs.iter().chain(&precision_cutoffs).any(|&k| k == 0) {
            return Err(EvalError::ConfigError("cutoffs must be greater than zero".to_string()));
        }
        Ok(Self { recall_cutoffs, precision_cutoffs })
    }

    /// The cutoff whose recall becomes the overall score.
    pub fn primary_cutoff(&self) -> usize {
        self.recall_cutoffs[0]
    }
}

#[async_trait]
impl Evaluator for RetrievalEvaluator {
    fn name(&self) -> &str {
        "retrieval"
    }

    async fn evaluate(
        &self,
        query: &str,
        retrieved: &[SearchResult],
        _generated_answer: &str,
        golden: Option<&GoldenExample>,
    ) -> Result<EvaluationResult> {
        let mut result = EvaluationResult::new(query);
        let Some(golden) = golden.filter(|g| !g.relevant_doc_ids.is_empty()) else {
            return Ok(result);
        };

        let ids: Vec<&str> = retrieved.iter().map(|r| r.chunk.id.as_str()).collect();
        let relevant = &golden.relevant_doc_ids;
        let metrics = &mut result.retrieval_metrics;

        for &k in &self.recall_cutoffs {
            metrics.insert(format!("recall@{k}"), recall_at_k(&ids, relevant, k));
        }
        for &k in &self.precision_cutoffs {
            metrics.insert(format!("precision@{k}"), precision_at_k(&ids, relevant, k));
        }
        metrics.insert("mrr".to_string(), mrr(&ids, relevant));

        result.overall_score = recall_at_k(&ids, relevant, self.primary_cutoff());
        debug!(query, retrieved = ids.len(), relevant = relevant.len(), "retrieval evaluated");
        Ok(result)
    }
}
