//! LLM-as-judge answer evaluation.
//!
//! The [`LlmEvaluator`] asks a [`Judge`] to score an answer on a 0..1 scale
//! and expects a bare number back. Anything else scores 0.

use std::sync::Arc;

use async_trait::async_trait;
use ragkit_rag::SearchResult;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::model::{EvaluationResult, GoldenExample};

/// A text generator used to grade answers.
///
/// Implementations wrap an LLM client. Call failures should be reported as
/// [`EvalError::Judge`](crate::EvalError::Judge).
#[async_trait]
pub trait Judge: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "judge"
    }

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Parse a judge response as a score.
///
/// The trimmed response must be a finite number. Returns `None` otherwise.
pub fn parse_score(response: &str) -> Option<f64> {
    response.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn faithfulness_prompt(answer: &str, context: &str) -> String {
    format!(
        "Evaluate if the answer is faithful to (grounded in) the context.\n\
         Score from 0 to 1:\n\
         - 1.0: All claims in the answer are supported by the context\n\
         - 0.5: Some claims are supported, some are not\n\
         - 0.0: The answer contains claims that contradict or aren't in the context\n\n\
         Context:\n{context}\n\n\
         Answer:\n{answer}\n\n\
         Score (just the number):"
    )
}

fn relevance_prompt(query: &str, answer: &str) -> String {
    format!(
        "Evaluate if the answer is relevant to the question.\n\
         Score from 0 to 1:\n\
         - 1.0: Directly and completely answers the question\n\
         - 0.5: Partially answers or is tangentially related\n\
         - 0.0: Does not answer the question\n\n\
         Question: {query}\n\
         Answer: {answer}\n\n\
         Score (just the number):"
    )
}

fn correctness_prompt(query: &str, answer: &str, reference: &str) -> String {
    format!(
        "Compare the answer to the reference answer for correctness.\n\
         Score from 0 to 1:\n\
         - 1.0: The answer is factually correct and matches the reference\n\
         - 0.5: Partially correct\n\
         - 0.0: Incorrect\n\n\
         Question: {query}\n\
         Reference Answer: {reference}\n\
         Generated Answer: {answer}\n\n\
         Score (just the number):"
    )
}

/// Scores generated answers with a [`Judge`].
///
/// Metrics (in `generation_metrics`):
///
/// | Metric | Judged against |
/// |--------|----------------|
/// | `faithfulness` | retrieved chunk texts joined by blank lines |
/// | `relevance` | the query |
/// | `correctness` | the golden reference answer (only with ground truth) |
///
/// The overall score is the mean of the metrics. Raw judge responses are kept
/// in `details` under `{metric}_response`.
pub struct LlmEvaluator {
    judge: Arc<dyn Judge>,
}

impl LlmEvaluator {
    /// Create an evaluator backed by `judge`.
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self { judge }
    }

    async fn score(&self, metric: &str, prompt: &str) -> Result<(f64, String)> {
        let response = self.judge.generate(prompt).await.inspect_err(|e| {
            error!(judge = self.judge.name(), metric, error = %e, "judge call failed");
        })?;

        let score = match parse_score(&response) {
            Some(value) if (0.0..=1.0).contains(&value) => value,
            Some(value) => {
                warn!(judge = self.judge.name(), metric, value, "judge score out of range, clamping");
                value.clamp(0.0, 1.0)
            }
            None => {
                warn!(judge = self.judge.name(), metric, response = %response.trim(), "unparseable judge output");
                0.0
            }
        };
        Ok((score, response))
    }
}

impl std::fmt::Debug for LlmEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmEvaluator").field("judge", &self.judge.name()).finish()
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    fn name(&self) -> &str {
        "llm_judge"
    }

    async fn evaluate(
        &self,
        query: &str,
        retrieved: &[SearchResult],
        generated_answer: &str,
        golden: Option<&GoldenExample>,
    ) -> Result<EvaluationResult> {
        let context =
            retrieved.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");

        let mut prompts = vec![
            ("faithfulness", faithfulness_prompt(generated_answer, &context)),
            ("relevance", relevance_prompt(query, generated_answer)),
        ];
        if let Some(golden) = golden {
            prompts.push((
                "correctness",
                correctness_prompt(query, generated_answer, &golden.reference_answer),
            ));
        }

        let mut result = EvaluationResult::new(query);
        for (metric, prompt) in prompts {
            let (score, response) = self.score(metric, &prompt).await?;
            result.generation_metrics.insert(metric.to_string(), score);
            result.details.insert(format!("{metric}_response"), json!(response));
        }

        let metrics = &result.generation_metrics;
        result.overall_score = metrics.values().sum::<f64>() / metrics.len() as f64;
        debug!(query, overall_score = result.overall_score, "answer judged");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use std::sync::Mutex;

    /// Replies with canned responses in order and records prompts.
    struct ScriptedJudge {
        responses: Mutex<Vec<&'static str>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedJudge {
        fn new(responses: &[&'static str]) -> Arc<Self> {
            let mut responses = responses.to_vec();
            responses.reverse();
            Arc::new(Self { responses: Mutex::new(responses), prompts: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl Judge for ScriptedJudge {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.responses.lock().unwrap().pop().unwrap_or("").to_string())
        }
    }

    struct DownJudge;

    #[async_trait]
    impl Judge for DownJudge {
        fn name(&self) -> &str {
            "down"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(EvalError::Judge { judge: "down".into(), message: "connection refused".into() })
        }
    }

    #[test]
    fn parse_score_accepts_only_numbers() {
        assert_eq!(parse_score(" 0.75\n"), Some(0.75));
        assert_eq!(parse_score("1"), Some(1.0));
        assert_eq!(parse_score("Score: 0.8"), None);
        assert_eq!(parse_score("NaN"), None);
        assert_eq!(parse_score(""), None);
    }

    #[tokio::test]
    async fn scores_faithfulness_and_relevance_without_golden() {
        let judge = ScriptedJudge::new(&["0.8", "0.6"]);
        let evaluator = LlmEvaluator::new(judge.clone());
        let result = evaluator.evaluate("q", &[], "answer", None).await.unwrap();

        assert_eq!(result.metric("faithfulness"), Some(0.8));
        assert_eq!(result.metric("relevance"), Some(0.6));
        assert_eq!(result.metric("correctness"), None);
        assert!((result.overall_score - 0.7).abs() < 1e-12);
        assert_eq!(judge.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn correctness_uses_reference_answer() {
        let judge = ScriptedJudge::new(&["1.0", "1.0", "0.1"]);
        let evaluator = LlmEvaluator::new(judge.clone());
        let golden = GoldenExample::new("q", ["c1"], "forty-two");
        let result = evaluator.evaluate("q", &[], "answer", Some(&golden)).await.unwrap();

        assert_eq!(result.metric("correctness"), Some(0.1));
        assert!((result.overall_score - 0.7).abs() < 1e-12);
        assert!(judge.prompts.lock().unwrap()[2].contains("Reference Answer: forty-two"));
    }

    #[tokio::test]
    async fn unparseable_and_out_of_range_output() {
        let judge = ScriptedJudge::new(&["great answer!", "7"]);
        let result = LlmEvaluator::new(judge).evaluate("q", &[], "a", None).await.unwrap();
        assert_eq!(result.metric("faithfulness"), Some(0.0));
        assert_eq!(result.metric("relevance"), Some(1.0));
        assert_eq!(result.details["faithfulness_response"], json!("great answer!"));
    }

    #[tokio::test]
    async fn judge_failure_propagates() {
        let err = LlmEvaluator::new(Arc::new(DownJudge)).evaluate("q", &[], "a", None).await.unwrap_err();
        assert!(matches!(err, EvalError::Judge { .. }));
    }
}
