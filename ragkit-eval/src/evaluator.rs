//! The evaluator trait.

use async_trait::async_trait;
use futures::future::try_join_all;
use ragkit_rag::SearchResult;

use crate::error::Result;
use crate::model::{EvalExample, EvaluationResult, GoldenExample};

/// Scores one query's retrieval results and generated answer.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_eval::{Evaluator, GoldenExample, RetrievalEvaluator};
///
/// let golden = GoldenExample::new("what is ownership?", ["book_chunk_3"], "...");
/// let result = RetrievalEvaluator::default()
///     .evaluate("what is ownership?", &results, &answer, Some(&golden))
///     .await?;
/// println!("recall@5 = {:?}", result.metric("recall@5"));
/// ```
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Short name used in composite details and logs.
    fn name(&self) -> &str {
        "evaluator"
    }

    /// Evaluate a single query.
    async fn evaluate(
        &self,
        query: &str,
        retrieved: &[SearchResult],
        generated_answer: &str,
        golden: Option<&GoldenExample>,
    ) -> Result<EvaluationResult>;

    /// Evaluate several examples concurrently.
    ///
    /// Results are returned in input order. The first error aborts the batch.
    async fn evaluate_batch(&self, examples: &[EvalExample]) -> Result<Vec<EvaluationResult>> {
        try_join_all(examples.iter().map(|example| {
            self.evaluate(
                &example.query,
                &example.retrieved,
                &example.generated_answer,
                example.golden.as_ref(),
            )
        }))
        .await
    }
}
