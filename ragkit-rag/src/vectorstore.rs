//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, MetadataFilter, SearchResult};
use crate::error::{RagError, Result};

/// A storage backend associating chunks with vectors and searching by similarity.
///
/// Every vector held by one store has the length reported by
/// [`dimensions`](VectorStore::dimensions). Mutators (`index`, `delete`,
/// `update`) must not interleave with an in-flight `search` over the same
/// store; implementations guard their state accordingly.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384)?;
/// store.index(chunk, embedding).await?;
/// let results = store.search(&query_embedding, 5, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The vector length every indexed vector must have.
    fn dimensions(&self) -> usize;

    /// Associate a chunk with its vector, keyed by `chunk.id`.
    ///
    /// Re-indexing an existing id replaces the previous association.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the vector length differs
    /// from [`dimensions`](VectorStore::dimensions).
    async fn index(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()>;

    /// Search for the `top_k` chunks most similar to `query`.
    ///
    /// Only chunks matching every entry of `filters` are considered. Results
    /// are ordered by descending score and carry 1-based ranks. Returns all
    /// matches when fewer than `top_k` exist.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>>;

    /// Remove a chunk. Removing an unknown id is a no-op.
    async fn delete(&self, chunk_id: &str) -> Result<()>;

    /// Replace a chunk and its vector: [`delete`](VectorStore::delete)
    /// followed by [`index`](VectorStore::index).
    ///
    /// The default takes two separate steps. Stores that lock their state
    /// override it to replace the entry under one guard.
    async fn update(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        check_dimensions(self.dimensions(), &vector)?;
        self.delete(&chunk.id).await?;
        self.index(chunk, vector).await
    }

    /// Search with access to the raw query text.
    ///
    /// Plain stores ignore the text. Decorators that need it (reranking,
    /// keyword fusion) override this method.
    async fn search_with_query(
        &self,
        _query_text: Option<&str>,
        query: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        self.search(query, top_k, filters).await
    }

    /// Number of indexed chunks.
    async fn len(&self) -> usize;

    /// Returns `true` if nothing is indexed.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Reject a vector whose length differs from the declared dimension.
pub(crate) fn check_dimensions(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
    }
    Ok(())
}
