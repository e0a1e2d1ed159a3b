//! Weighted combination of several evaluators.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use ragkit_rag::SearchResult;
use serde_json::json;
use tracing::debug;

use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::model::{EvaluationResult, GoldenExample};

/// Runs several evaluators on the same input and blends their scores.
///
/// ```text
/// overall = Σ (w_i · score_i) / Σ w_i
/// ```
///
/// Metric and detail maps are merged in evaluator order, so a later
/// evaluator's key overwrites an earlier one's. Each evaluator's own score
/// and weight are listed under the `evaluator_scores` detail.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use ragkit_eval::{CompositeEvaluator, LlmEvaluator, RetrievalEvaluator};
///
/// let evaluator = CompositeEvaluator::with_weights(
///     vec![Arc::new(RetrievalEvaluator::default()), Arc::new(LlmEvaluator::new(judge))],
///     vec![1.0, 2.0],
/// )?;
/// ```
pub struct CompositeEvaluator {
    evaluators: Vec<Arc<dyn Evaluator>>,
    weights: Vec<f64>,
}

impl CompositeEvaluator {
    /// Combine `evaluators` with equal weights.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigError`] if `evaluators` is empty.
    pub fn new(evaluators: Vec<Arc<dyn Evaluator>>) -> Result<Self> {
        let weights = vec![1.0; evaluators.len()];
        Self::with_weights(evaluators, weights)
    }

    /// Combine `evaluators` with explicit weights, one per evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigError`] if the lengths differ, a weight is
    /// negative or not finite, or the weights sum to zero.
    pub fn with_weights(evaluators: Vec<Arc<dyn Evaluator>>, weights: Vec<f64>) -> Result<Self> {
        if evaluators.len() != weights.len() {
            return Err(EvalError::ConfigError(format!(
                "got {} weights for {} evaluators",
                weights.len(),
                evaluators.len()
            )));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(EvalError::ConfigError(format!(
                "weights must be finite and non-negative, got {bad}"
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(EvalError::ConfigError("weights must not sum to zero".to_string()));
        }
        Ok(Self { evaluators, weights })
    }

    /// The weight assigned to each evaluator, in order.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl std::fmt::Debug for CompositeEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.evaluators.iter().map(|e| e.name()).collect();
        f.debug_struct("CompositeEvaluator")
            .field("evaluators", &names)
            .field("weights", &self.weights)
            .finish()
    }
}

#[async_trait]
impl Evaluator for CompositeEvaluator {
    fn name(&self) -> &str {
        "composite"
    }

    async fn evaluate(
        &self,
        query: &str,
        retrieved: &[SearchResult],
        generated_answer: &str,
        golden: Option<&GoldenExample>,
    ) -> Result<EvaluationResult> {
        let results = try_join_all(
            self.evaluators
                .iter()
                .map(|e| e.evaluate(query, retrieved, generated_answer, golden)),
        )
        .await?;

        let mut combined = EvaluationResult::new(query);
        let mut weighted_sum = 0.0;
        let mut scores = Vec::with_capacity(results.len());

        for ((evaluator, weight), result) in self.evaluators.iter().zip(&self.weights).zip(results) {
            weighted_sum += weight * result.overall_score;
            scores.push(json!({
                "evaluator": evaluator.name(),
                "weight": weight,
                "score": result.overall_score,
            }));
            combined.retrieval_metrics.extend(result.retrieval_metrics);
            combined.generation_metrics.extend(result.generation_metrics);
            combined.details.extend(result.details);
        }

        combined.overall_score = weighted_sum / self.weights.iter().sum::<f64>();
        combined.details.insert("evaluator_scores".to_string(), json!(scores));
        debug!(query, evaluators = self.evaluators.len(), overall_score = combined.overall_score, "composite evaluated");
        Ok(combined)
    }
}
