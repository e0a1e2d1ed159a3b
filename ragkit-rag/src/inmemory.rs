//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a brute-force vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small-scale use cases.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, MetadataFilter, SearchResult, assign_ranks, passes_filter};
use crate::error::{RagError, Result};
use crate::similarity::cosine_similarity;
use crate::vectorstore::{VectorStore, check_dimensions};

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
    /// Insertion sequence, used to break score ties deterministically.
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Searches scan every stored vector. Equal scores are ordered by insertion:
/// re-indexing an existing id keeps its original slot, while
/// [`update`](VectorStore::update) moves the chunk to the end.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384)?;
/// store.index(chunk, embedding).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create a new empty store for vectors of length `dimensions`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::ConfigError("dimensions must be greater than zero".to_string()));
        }
        Ok(Self { dimensions, inner: RwLock::new(Inner::default()) })
    }

    /// Fetch an indexed chunk by id.
    pub async fn get(&self, chunk_id: &str) -> Option<Chunk> {
        self.inner.read().await.entries.get(chunk_id).map(|e| e.chunk.clone())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn index(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        check_dimensions(self.dimensions, &vector)?;
        let mut inner = self.inner.write().await;
        let seq = match inner.entries.get(&chunk.id) {
            Some(existing) => existing.seq,
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                seq
            }
        };
        inner.entries.insert(chunk.id.clone(), Entry { chunk, vector, seq });
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        check_dimensions(self.dimensions, query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let inner = self.inner.read().await;
        let mut scored: Vec<(f32, u64, &Chunk)> = inner
            .entries
            .values()
            .filter(|entry| passes_filter(&entry.chunk, filters))
            .map(|entry| (cosine_similarity(&entry.vector, query), entry.seq, &entry.chunk))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal).then_with(|| a.1.cmp(&b.1))
        });
        scored.truncate(top_k);

        let mut results: Vec<SearchResult> = scored
            .into_iter()
            .map(|(score, _, chunk)| SearchResult { chunk: chunk.clone(), score, rank: 0 })
            .collect();
        assign_ranks(&mut results);

        debug!(total = inner.entries.len(), returned = results.len(), "in-memory search");
        Ok(results)
    }

    async fn delete(&self, chunk_id: &str) -> Result<()> {
        self.inner.write().await.entries.remove(chunk_id);
        Ok(())
    }

    /// Replace a chunk under a single write guard, so no search observes the
    /// id missing. The chunk takes a fresh insertion slot.
    async fn update(&self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        check_dimensions(self.dimensions, &vector)?;
        let mut inner = self.inner.write().await;
        inner.entries.remove(&chunk.id);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(chunk.id.clone(), Entry { chunk, vector, seq });
        Ok(())
    }

    async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}
