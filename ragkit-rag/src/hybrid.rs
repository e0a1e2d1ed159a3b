//! Hybrid vector + keyword retrieval.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::RagConfig;
use crate::document::{Chunk, MetadataFilter, SearchResult};
use crate::error::{RagError, Result};
use crate::fusion::{Normalization, fuse, validate_alpha};
use crate::keyword::KeywordIndex;
use crate::vectorstore::VectorStore;

/// A [`VectorStore`] decorator that keeps a [`KeywordIndex`] alongside the
/// wrapped store and fuses both rankings at query time.
///
/// `index`, `delete` and `update` change both sides while holding the keyword
/// index's write guard, and hybrid searches hold its read guard across both
/// lookups, so a search never sees one side updated without the other.
/// [`search_hybrid`](Self::search_hybrid)
/// fetches `top_k * candidate_multiplier` candidates from each side, fuses
/// them with [`fuse`], and truncates to `top_k`. Through the [`VectorStore`]
/// trait, `search_with_query` runs hybrid search with the default alpha when
/// query text is available and plain vector search otherwise.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_rag::{HybridStore, InMemoryVectorStore, Normalization};
///
/// let store = HybridStore::new(InMemoryVectorStore::new(384)?)
///     .with_alpha(0.7)?
///     .with_normalization(Normalization::Softmax);
/// let results = store.search_hybrid("tokio runtime", &query_vec, 5, 0.7, None).await?;
/// ```
#[derive(Debug)]
pub struct HybridStore<S> {
    base: S,
    keywords: RwLock<KeywordIndex>,
    alpha: f32,
    normalization: Normalization,
    candidate_multiplier: usize,
}

impl<S: VectorStore> HybridStore<S> {
    /// Wrap `base` with an empty keyword index, alpha 0.5, min-max
    /// normalization and a candidate multiplier of 2.
    ///
    /// The base store should be empty; chunks indexed into it beforehand are
    /// not visible to keyword search.
    pub fn new(base: S) -> Self {
        Self {
            base,
            keywords: RwLock::new(KeywordIndex::new()),
            alpha: 0.5,
            normalization: Normalization::default(),
            candidate_multiplier: 2,
        }
    }

    /// Wrap `base` using the hybrid settings of `config`: `hybrid_alpha` as
    /// the default vector weight and `normalization` for fusion.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `hybrid_alpha` is outside `[0, 1]`.
    pub fn from_config(base: S, config: &RagConfig) -> Result<Self> {
        Ok(Self::new(base).with_alpha(config.hybrid_alpha)?.with_normalization(config.normalization))
    }

    /// Set the default vector weight used by `search_with_query`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `alpha` is outside `[0, 1]`.
    pub fn with_alpha(mut self, alpha: f32) -> Result<Self> {
        validate_alpha(alpha)?;
        self.alpha = alpha;
        Ok(self)
    }

    /// Set the score normalization applied to both lists.
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set how many candidates per result are fetched from each side.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `multiplier` is zero.
    pub fn with_candidate_multiplier(mut self, multiplier: usize) -> Result<Self> {
        if multiplier == 0 {
            return Err(RagError::ConfigError(
                "candidate_multiplier must be greater than zero".to_string(),
            ));
        }
        self.candidate_multiplier = multiplier;
        Ok(self)
    }

    /// The wrapped vector store.
    pub fn base(&self) -> &S {
        &self.base
    }

    /// Keyword-only search over the indexed chunks.
    pub async fn search_keywords(
        &self,
        query_text: &str,
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Vec<SearchResult> {
        self.keywords.read().await.search(query_text, top_k, filters)
    }

    /// Search both sides and fuse them with the given `alpha`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `alpha` is outside `[0, 1]`, plus
    /// any error from the wrapped store.
    pub async fn search_hybrid(
        &self,
        query_text: &str,
        query: &[f32],
        top_k: usize,
        alpha: f32,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        validate_alpha(alpha)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let fetch_k = top_k.saturating_mul(self.candidate_multiplier);

        let keywords = self.keywords.read().await;
        let vector_results = self.base.search(query, fetch_k, filters).await?;
        let keyword_results = keywords.search(query_text, fetch_k, filters);
        drop(keywords);
        debug!(
            vector = vector_results.len(),
            keyword = keyword_results.len(),
            alpha,
            "fusing hybrid candidates"
        );

        let mut fused = fuse(vector_results, keyword_results, alpha, self.normalization)?;
        fused.truncate(top_k);
        Ok(fused)
    }
}

#[async_trait]
impl<S: VectorStore> VectorStore for HybridStore<S> {
    fn dimensions(&self) -> usize {
        self.base.dimensions()
    }

    async fn index(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        let mut keywords = self.keywords.write().await;
        self.base.index(chunk.clone(), vector).await?;
        keywords.index(chunk);
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        self.base.search(query, top_k, filters).await
    }

    async fn delete(&self, chunk_id: &str) -> Result<()> {
        let mut keywords = self.keywords.write().await;
        self.base.delete(chunk_id).await?;
        keywords.delete(chunk_id);
        Ok(())
    }

    async fn update(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        let mut keywords = self.keywords.write().await;
        self.base.update(chunk.clone(), vector).await?;
        keywords.delete(&chunk.id);
        keywords.index(chunk);
        Ok(())
    }

    async fn search_with_query(
        &self,
        query_text: Option<&str>,
        query: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        match query_text {
            Some(text) => self.search_hybrid(text, query, top_k, self.alpha, filters).await,
            None => self.base.search(query, top_k, filters).await,
        }
    }

    async fn len(&self) -> usize {
        self.base.len().await
    }
}
