//! Reranking decorator for any [`VectorStore`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::config::RagConfig;
use crate::document::{Chunk, MetadataFilter, SearchResult, assign_ranks};
use crate::error::{RagError, Result};
use crate::reranker::Reranker;
use crate::vectorstore::VectorStore;

/// Default over-fetch factor for [`RerankedStore`].
pub const DEFAULT_K_MULTIPLIER: usize = 5;

/// A [`VectorStore`] that over-fetches from a wrapped store and lets a
/// [`Reranker`] choose the final order.
///
/// Searches always request `top_k * k_multiplier` candidates from the base
/// store. Without query text (or without candidates) the base results are
/// truncated to `top_k`. Otherwise the candidate texts go to the reranker and
/// each returned hit becomes a result holding the original chunk, the
/// reranker's score, and a rank following the reranker's order. A hit index
/// outside the candidate list, or repeated, is a [`RagError::RerankerError`].
///
/// `index`, `delete` and `update` are forwarded unchanged.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use ragkit_rag::{InMemoryVectorStore, LexicalReranker, RerankedStore, VectorStore};
///
/// let store = RerankedStore::new(InMemoryVectorStore::new(384)?, Arc::new(LexicalReranker), 3)?;
/// let results = store.search_with_query(Some("how do I reset"), &query_vec, 5, None).await?;
/// ```
pub struct RerankedStore<S> {
    base: S,
    reranker: Arc<dyn Reranker>,
    k_multiplier: usize,
}

impl<S: VectorStore> RerankedStore<S> {
    /// Wrap `base` with `reranker`, over-fetching by `k_multiplier`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `k_multiplier` is zero.
    pub fn new(base: S, reranker: Arc<dyn Reranker>, k_multiplier: usize) -> Result<Self> {
        if k_multiplier == 0 {
            return Err(RagError::ConfigError("k_multiplier must be greater than zero".to_string()));
        }
        Ok(Self { base, reranker, k_multiplier })
    }

    /// Wrap `base` with `reranker`, over-fetching by `config.rerank_multiplier`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `rerank_multiplier` is zero.
    pub fn from_config(base: S, reranker: Arc<dyn Reranker>, config: &RagConfig) -> Result<Self> {
        Self::new(base, reranker, config.rerank_multiplier)
    }

    /// The wrapped store.
    pub fn base(&self) -> &S {
        &self.base
    }

    /// The over-fetch factor.
    pub fn k_multiplier(&self) -> usize {
        self.k_multiplier
    }
}

impl<S> std::fmt::Debug for RerankedStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankedStore").field("k_multiplier", &self.k_multiplier).finish()
    }
}

#[async_trait]
impl<S: VectorStore> VectorStore for RerankedStore<S> {
    fn dimensions(&self) -> usize {
        self.base.dimensions()
    }

    async fn index(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        self.base.index(chunk, vector).await
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        self.search_with_query(None, query, top_k, filters).await
    }

    async fn delete(&self, chunk_id: &str) -> Result<()> {
        self.base.delete(chunk_id).await
    }

    async fn update(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        self.base.update(chunk, vector).await
    }

    async fn search_with_query(
        &self,
        query_text: Option<&str>,
        query: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        let fetch_k = top_k.saturating_mul(self.k_multiplier);
        let mut candidates = self.base.search_with_query(query_text, query, fetch_k, filters).await?;
        debug!(requested = fetch_k, candidates = candidates.len(), "fetched rerank candidates");

        let text = match query_text {
            Some(text) if !candidates.is_empty() => text,
            _ => {
                candidates.truncate(top_k);
                assign_ranks(&mut candidates);
                return Ok(candidates);
            }
        };

        let documents: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        let hits = self.reranker.rerank(text, &documents, top_k).await.inspect_err(|e| {
            error!(error = %e, "reranking failed");
        })?;

        let mut results = Vec::with_capacity(hits.len().min(top_k));
        let mut seen = HashSet::with_capacity(results.capacity());
        for hit in hits.into_iter().take(top_k) {
            let candidate = candidates.get(hit.index).ok_or_else(|| RagError::RerankerError {
                reranker: "RerankedStore".to_string(),
                message: format!(
                    "reranker returned index {} for {} candidates",
                    hit.index,
                    candidates.len()
                ),
            })?;
            if !seen.insert(hit.index) {
                return Err(RagError::RerankerError {
                    reranker: "RerankedStore".to_string(),
                    message: format!("reranker returned index {} more than once", hit.index),
                });
            }
            results.push(SearchResult { chunk: candidate.chunk.clone(), score: hit.score, rank: 0 });
        }
        assign_ranks(&mut results);
        Ok(results)
    }

    async fn len(&self) -> usize {
        self.base.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;
    use crate::inmemory::InMemoryVectorStore;
    use crate::reranker::{LexicalReranker, RerankHit};

    /// Reverses the candidate list and scores by reversed position.
    struct ReverseReranker;

    #[async_trait]
    impl Reranker for ReverseReranker {
        async fn rerank(&self, _query: &str, documents: &[&str], top_k: usize) -> Result<Vec<RerankHit>> {
            Ok((0..documents.len())
                .rev()
                .take(top_k)
                .map(|index| RerankHit { index, score: index as f32 * 10.0 })
                .collect())
        }
    }

    struct BrokenReranker;

    /// Returns the first candidate twice.
    struct RepeatingReranker;

    #[async_trait]
    impl Reranker for RepeatingReranker {
        async fn rerank(&self, _query: &str, _documents: &[&str], _top_k: usize) -> Result<Vec<RerankHit>> {
            Ok(vec![RerankHit { index: 0, score: 0.9 }, RerankHit { index: 0, score: 0.8 }])
        }
    }

    #[async_trait]
    impl Reranker for BrokenReranker {
        async fn rerank(&self, _query: &str, _documents: &[&str], _top_k: usize) -> Result<Vec<RerankHit>> {
            Ok(vec![RerankHit { index: 99, score: 1.0 }])
        }
    }

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            document_id: "doc".to_string(),
            text: text.to_string(),
            metadata: Metadata::new(),
            position: 0,
        }
    }

    async fn base() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new(2).unwrap();
        store.index(chunk("a", "alpha"), vec![1.0, 0.0]).await.unwrap();
        store.index(chunk("b", "beta"), vec![0.8, 0.2]).await.unwrap();
        store.index(chunk("c", "gamma"), vec![0.5, 0.5]).await.unwrap();
        store
    }

    #[tokio::test]
    async fn reranker_order_and_scores_win() {
        let store = RerankedStore::new(base().await, Arc::new(ReverseReranker), 2).unwrap();
        let results = store.search_with_query(Some("q"), &[1.0, 0.0], 2, None).await.unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, ["c", "b"]);
        assert_eq!(results[0].score, 20.0);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
    }

    #[tokio::test]
    async fn without_query_text_behaves_like_base() {
        let store = RerankedStore::new(base().await, Arc::new(ReverseReranker), 3).unwrap();
        let reranked = store.search(&[1.0, 0.0], 2, None).await.unwrap();
        let plain = store.base().search(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(reranked, plain);
    }

    #[tokio::test]
    async fn empty_candidates_return_empty() {
        let store = RerankedStore::new(
            InMemoryVectorStore::new(2).unwrap(),
            Arc::new(LexicalReranker),
            3,
        )
        .unwrap();
        let results = store.search_with_query(Some("q"), &[1.0, 0.0], 2, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_hit_is_a_reranker_error() {
        let store = RerankedStore::new(base().await, Arc::new(BrokenReranker), 2).unwrap();
        let err = store.search_with_query(Some("q"), &[1.0, 0.0], 1, None).await.unwrap_err();
        assert!(matches!(err, RagError::RerankerError { .. }));
        assert!(err.is_external());
    }

    #[tokio::test]
    async fn repeated_hit_is_a_reranker_error() {
        let store = RerankedStore::new(base().await, Arc::new(RepeatingReranker), 2).unwrap();
        let err = store.search_with_query(Some("q"), &[1.0, 0.0], 2, None).await.unwrap_err();
        assert!(matches!(err, RagError::RerankerError { .. }));
    }

    #[tokio::test]
    async fn mutations_are_forwarded() {
        let store = RerankedStore::new(base().await, Arc::new(LexicalReranker), 2).unwrap();
        store.delete("a").await.unwrap();
        store.update(chunk("b", "beta two"), vec![0.0, 1.0]).await.unwrap();
        assert_eq!(store.len().await, 2);
        assert_eq!(store.base().get("b").await.map(|c| c.text), Some("beta two".to_string()));
    }

    #[test]
    fn zero_multiplier_is_rejected() {
        let base = InMemoryVectorStore::new(2).unwrap();
        assert!(RerankedStore::new(base, Arc::new(LexicalReranker), 0).is_err());
    }
}
