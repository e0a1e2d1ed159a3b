//! Retrieval pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-query workflow by
//! composing an [`EmbeddingProvider`], a [`VectorStore`] and a [`Chunker`].
//! Reranking and hybrid search are added by wrapping the store in
//! [`RerankedStore`](crate::RerankedStore) or [`HybridStore`](crate::HybridStore)
//! (their `from_config` constructors read the matching [`RagConfig`] fields);
//! the pipeline always searches through
//! [`search_with_query`](VectorStore::search_with_query) so decorators see the
//! query text.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragkit_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(384)?))
//!     .build()?;
//!
//! pipeline.ingest(&document).await?;
//! let results = pipeline.query("search query", None).await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Chunk, Document, MetadataFilter, SearchResult, assign_ranks};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// The retrieval pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → index) and query
/// execution (embed → search → threshold filter). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ingest a single document: chunk → embed → index.
    ///
    /// Returns the chunks that were indexed.
    ///
    /// # Errors
    ///
    /// Propagates the embedder's or store's error unchanged. Chunks indexed
    /// before a store failure stay indexed.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<Chunk>> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
        })?;
        if embeddings.len() != chunks.len() {
            error!(
                document.id = %document.id,
                expected = chunks.len(),
                actual = embeddings.len(),
                "embedder returned wrong number of vectors"
            );
            return Err(RagError::EmbeddingError {
                provider: "pipeline".to_string(),
                message: format!(
                    "expected {} embeddings for document '{}', got {}",
                    chunks.len(),
                    document.id,
                    embeddings.len()
                ),
            });
        }

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            self.vector_store.index(chunk.clone(), embedding).await.inspect_err(|e| {
                error!(document.id = %document.id, chunk.id = %chunk.id, error = %e, "indexing failed");
            })?;
        }

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Ingest multiple documents in order.
    ///
    /// Returns all chunks that were indexed across all documents.
    ///
    /// # Errors
    ///
    /// Stops at the first document that fails and returns its error.
    pub async fn ingest_batch(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut all_chunks = Vec::new();
        for document in documents {
            let chunks = self.ingest(document).await?;
            all_chunks.extend(chunks);
        }
        Ok(all_chunks)
    }

    /// Query the pipeline: embed → search → filter by threshold.
    ///
    /// Returns at most `top_k` results ordered by descending score, ranked
    /// from 1. Results below the configured `similarity_threshold` are dropped.
    ///
    /// # Errors
    ///
    /// Propagates the embedder's or store's error unchanged.
    pub async fn query(
        &self,
        query: &str,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedding_provider.embed_query(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;

        let results = self
            .vector_store
            .search_with_query(Some(query), &query_embedding, self.config.top_k, filters)
            .await
            .inspect_err(|e| {
                error!(error = %e, "vector store search failed");
            })?;

        let threshold = self.config.similarity_threshold;
        let mut filtered: Vec<SearchResult> =
            results.into_iter().filter(|r| r.score >= threshold).collect();
        assign_ranks(&mut filtered);

        info!(result_count = filtered.len(), "query completed");
        Ok(filtered)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `vector_store` are required. The
/// chunker defaults to [`RagConfig::build_chunker`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .chunker(Arc::new(chunker))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the chunker built from the configuration.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration and wiring.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the configuration is invalid, and [`RagError::DimensionMismatch`] if
    /// the embedder and store disagree on dimensions.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        if embedding_provider.dimensions() != vector_store.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: vector_store.dimensions(),
                actual: embedding_provider.dimensions(),
            });
        }

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => config.build_chunker()?,
        };

        Ok(RagPipeline { config, embedding_provider, vector_store, chunker })
    }
}
