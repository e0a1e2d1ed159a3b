//! Content-addressed embedding cache and the [`CachedEmbedder`] decorator.
//!
//! The cache is an ordinary owned value: create one, hand it to a
//! [`CachedEmbedder`], and drop it when done. There is no process-wide
//! instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Derive the cache key for a text: lowercase hex SHA-256 of its UTF-8 bytes.
pub fn cache_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// An in-memory map from content hash to embedding vector.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the embedding cached for `text`, counting the hit or miss.
    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let found = self.entries.read().await.get(&cache_key(text)).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store the embedding for `text`.
    pub async fn insert(&self, text: &str, embedding: Vec<f32>) {
        self.entries.write().await.insert(cache_key(text), embedding);
    }

    /// Number of cached embeddings.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every cached embedding. Counters are kept.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of lookups that found an entry.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that found nothing.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// An [`EmbeddingProvider`] decorator that serves repeated texts from an
/// [`EmbeddingCache`].
///
/// `embed` and `embed_batch` go through the cache; a batch sends only the
/// misses to the wrapped provider and reassembles results in input order.
/// `embed_query` is passed straight through, since asymmetric models may embed
/// queries differently from documents.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_rag::{CachedEmbedder, EmbeddingCache};
///
/// let embedder = CachedEmbedder::new(my_provider, EmbeddingCache::new());
/// let first = embedder.embed("hello").await?;   // computed
/// let second = embedder.embed("hello").await?;  // served from cache
/// ```
#[derive(Debug)]
pub struct CachedEmbedder<E> {
    inner: E,
    cache: EmbeddingCache,
}

impl<E: EmbeddingProvider> CachedEmbedder<E> {
    /// Wrap `inner` with the given cache.
    pub fn new(inner: E, cache: EmbeddingCache) -> Self {
        Self { inner, cache }
    }

    /// The cache backing this embedder.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Unwrap into the provider and the cache.
    pub fn into_parts(self) -> (E, EmbeddingCache) {
        (self.inner, self.cache)
    }
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(embedding) = self.cache.get(text).await {
            return Ok(embedding);
        }
        let embedding = self.inner.embed(text).await?;
        self.cache.insert(text, embedding.clone()).await;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing: Vec<&str> = Vec::new();
        let mut missing_slots: Vec<usize> = Vec::new();

        for (i, text) in texts.iter().copied().enumerate() {
            let cached = self.cache.get(text).await;
            if cached.is_none() {
                missing.push(text);
                missing_slots.push(i);
            }
            results.push(cached);
        }

        debug!(total = texts.len(), misses = missing.len(), "embedding cache lookup");

        if !missing.is_empty() {
            let computed = self.inner.embed_batch(&missing).await?;
            if computed.len() != missing.len() {
                return Err(RagError::EmbeddingError {
                    provider: "CachedEmbedder".to_string(),
                    message: format!(
                        "inner provider returned {} embeddings for {} texts",
                        computed.len(),
                        missing.len()
                    ),
                });
            }
            for ((slot, text), embedding) in missing_slots.into_iter().zip(missing).zip(computed) {
                self.cache.insert(text, embedding.clone()).await;
                results[slot] = Some(embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.inner.embed_query(query).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
