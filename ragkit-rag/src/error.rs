//! Error types for the `ragkit-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
///
/// Variants fall into two families: configuration errors raised by this crate
/// before any work is done, and failures reported by external collaborators
/// (embedders, rerankers, loaders, remote stores). Use
/// [`is_config_error`](RagError::is_config_error) and
/// [`is_external`](RagError::is_external) to tell them apart when deciding
/// whether a retry makes sense.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// A document loader failed to produce documents.
    #[error("Loader error ({origin}): {message}")]
    LoaderError {
        /// The source the loader was reading from.
        origin: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A vector did not have the dimension declared by the store.
    #[error("Configuration error: vector dimension mismatch (expected {expected}, got {actual})")]
    DimensionMismatch {
        /// The dimension the store was created with.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// An I/O error raised while reading source material.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Returns `true` for errors caused by invalid parameters or mismatched
    /// dimensions.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError(_) | Self::DimensionMismatch { .. })
    }

    /// Returns `true` for failures reported by an external collaborator.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingError { .. }
                | Self::VectorStoreError { .. }
                | Self::RerankerError { .. }
                | Self::LoaderError { .. }
                | Self::Io(_)
        )
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
