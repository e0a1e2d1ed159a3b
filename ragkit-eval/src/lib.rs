//! Evaluation for ragkit retrieval pipelines.
//!
//! This crate provides:
//! - Ranking metrics: [`recall_at_k`], [`precision_at_k`], [`mrr`]
//! - The [`Evaluator`] trait with batch evaluation
//! - [`RetrievalEvaluator`] scoring retrieved chunk ids against ground truth
//! - [`LlmEvaluator`] scoring answers through an LLM [`Judge`]
//! - [`CompositeEvaluator`] blending several evaluators by weight
//! - [`EvaluationSummary`] for batch means

mod composite;
mod error;
mod evaluator;
mod judge;
pub mod metrics;
mod model;
mod report;
mod retrieval;

pub use composite::CompositeEvaluator;
pub use error::{EvalError, Result};
pub use evaluator::Evaluator;
pub use judge::{Judge, LlmEvaluator, parse_score};
pub use metrics::{mrr, precision_at_k, recall_at_k};
pub use model::{EvalExample, EvaluationResult, GoldenExample};
pub use report::EvaluationSummary;
pub use retrieval::RetrievalEvaluator;
