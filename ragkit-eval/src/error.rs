//! Error types for the `ragkit-eval` crate.

use ragkit_rag::RagError;
use thiserror::Error;

/// Errors that can occur while evaluating retrieval and answers.
#[derive(Debug, Error)]
pub enum EvalError {
    /// An evaluator was constructed with invalid parameters.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The LLM judge failed to produce a response.
    #[error("Judge error ({judge}): {message}")]
    Judge {
        /// The judge that produced the error.
        judge: String,
        /// A description of the failure.
        message: String,
    },

    /// A retrieval-side error surfaced during evaluation.
    #[error(transparent)]
    Rag(#[from] RagError),
}

impl EvalError {
    /// Returns `true` for invalid evaluator configuration.
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::ConfigError(_) => true,
            Self::Rag(e) => e.is_config_error(),
            Self::Judge { .. } => false,
        }
    }
}

/// A convenience result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
