//! Configuration for the retrieval pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunking::{
    Chunker, DEFAULT_SEPARATORS, FixedSizeChunker, RecursiveChunker, SentenceChunker,
    validate_window,
};
use crate::error::{RagError, Result};
use crate::fusion::{Normalization, validate_alpha};
use crate::reranked::DEFAULT_K_MULTIPLIER;

/// Which [`Chunker`] a [`RagConfig`] builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// [`FixedSizeChunker`] with `chunk_size` / `chunk_overlap`.
    Fixed,
    /// [`RecursiveChunker`] with `chunk_size` / `chunk_overlap` / `separators`.
    #[default]
    Recursive,
    /// [`SentenceChunker`] with `chunk_size` as the limit.
    Sentence,
}

/// Configuration parameters for the retrieval pipeline.
///
/// Deserialized values are not checked automatically; call
/// [`validate`](RagConfig::validate) before use, or construct through
/// [`RagConfig::builder`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunking algorithm used by [`build_chunker`](RagConfig::build_chunker).
    pub chunking_strategy: ChunkingStrategy,
    /// Separators for the recursive strategy, coarse to fine.
    pub separators: Vec<String>,
    /// Number of top results to return from search.
    pub top_k: usize,
    /// Minimum score for results (results below this are filtered out).
    pub similarity_threshold: f32,
    /// Over-fetch factor for reranked search.
    pub rerank_multiplier: usize,
    /// Vector weight for hybrid search.
    pub hybrid_alpha: f32,
    /// Score normalization for hybrid fusion.
    pub normalization: Normalization,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 100,
            chunking_strategy: ChunkingStrategy::default(),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            top_k: 10,
            similarity_threshold: 0.0,
            rerank_multiplier: DEFAULT_K_MULTIPLIER,
            hybrid_alpha: 0.5,
            normalization: Normalization::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`, unless the strategy is
    ///   [`Sentence`](ChunkingStrategy::Sentence), which ignores overlap
    /// - `top_k == 0`
    /// - `rerank_multiplier == 0`
    /// - `hybrid_alpha` is outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        match self.chunking_strategy {
            ChunkingStrategy::Sentence => validate_window(self.chunk_size, 0)?,
            ChunkingStrategy::Fixed | ChunkingStrategy::Recursive => {
                validate_window(self.chunk_size, self.chunk_overlap)?
            }
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.rerank_multiplier == 0 {
            return Err(RagError::ConfigError(
                "rerank_multiplier must be greater than zero".to_string(),
            ));
        }
        validate_alpha(self.hybrid_alpha)
    }

    /// Build the chunker selected by `chunking_strategy`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the chunk parameters are invalid.
    pub fn build_chunker(&self) -> Result<Arc<dyn Chunker>> {
        Ok(match self.chunking_strategy {
            ChunkingStrategy::Fixed => {
                Arc::new(FixedSizeChunker::new(self.chunk_size, self.chunk_overlap)?)
            }
            ChunkingStrategy::Recursive => Arc::new(
                RecursiveChunker::new(self.chunk_size, self.chunk_overlap)?
                    .with_separators(self.separators.iter().cloned()),
            ),
            ChunkingStrategy::Sentence => Arc::new(SentenceChunker::new(self.chunk_size)?),
        })
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the chunking algorithm.
    pub fn chunking_strategy(mut self, strategy: ChunkingStrategy) -> Self {
        self.config.chunking_strategy = strategy;
        self
    }

    /// Replace the recursive strategy's separators.
    pub fn separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of top results to return from search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the reranking over-fetch factor.
    pub fn rerank_multiplier(mut self, multiplier: usize) -> Self {
        self.config.rerank_multiplier = multiplier;
        self
    }

    /// Set the hybrid search vector weight.
    pub fn hybrid_alpha(mut self, alpha: f32) -> Self {
        self.config.hybrid_alpha = alpha;
        self
    }

    /// Set the hybrid fusion normalization.
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.config.normalization = normalization;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
