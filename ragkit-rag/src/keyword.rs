//! BM25 keyword index over chunk text.
//!
//! This module wraps the [`bm25`](https://crates.io/crates/bm25) crate to give
//! the keyword side of hybrid search. Scores are raw BM25 values (unbounded,
//! non-negative); [`fuse`](crate::fusion::fuse) normalizes them before blending
//! with vector scores.

use std::cmp::Ordering;
use std::collections::HashMap;

use bm25::{Language, SearchEngine, SearchEngineBuilder};

use crate::document::{Chunk, MetadataFilter, SearchResult, assign_ranks, passes_filter};

/// BM25-based keyword index keyed by chunk id.
///
/// Queries and chunk text go through the crate's English tokenizer
/// (lowercasing, stop words, stemming). Equal scores are ordered by insertion,
/// matching [`InMemoryVectorStore`](crate::InMemoryVectorStore).
///
/// This type is not synchronized; [`HybridStore`](crate::HybridStore) guards it
/// with a lock.
pub struct KeywordIndex {
    engine: SearchEngine<String>,
    chunks: HashMap<String, (Chunk, u64)>,
    next_seq: u64,
}

impl std::fmt::Debug for KeywordIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordIndex").field("chunks", &self.chunks.len()).finish()
    }
}

impl KeywordIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        let empty: Vec<bm25::Document<String>> = Vec::new();
        let engine = SearchEngineBuilder::<String>::with_documents(Language::English, empty).build();
        Self { engine, chunks: HashMap::new(), next_seq: 0 }
    }

    /// Add or replace a chunk. Replacing keeps the chunk's insertion slot.
    pub fn index(&mut self, chunk: Chunk) {
        self.engine.upsert(bm25::Document { id: chunk.id.clone(), contents: chunk.text.clone() });
        let seq = match self.chunks.get(&chunk.id) {
            Some((_, seq)) => *seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        self.chunks.insert(chunk.id.clone(), (chunk, seq));
    }

    /// Remove a chunk. Unknown ids are ignored.
    ///
    /// The BM25 engine has no removal, so it is rebuilt from the remaining
    /// chunks to keep document frequencies exact.
    pub fn delete(&mut self, chunk_id: &str) {
        if self.chunks.remove(chunk_id).is_none() {
            return;
        }
        let mut remaining: Vec<&(Chunk, u64)> = self.chunks.values().collect();
        remaining.sort_by_key(|(_, seq)| *seq);
        let documents: Vec<bm25::Document<String>> = remaining
            .into_iter()
            .map(|(chunk, _)| bm25::Document { id: chunk.id.clone(), contents: chunk.text.clone() })
            .collect();
        self.engine =
            SearchEngineBuilder::<String>::with_documents(Language::English, documents).build();
    }

    /// Rank chunks matching `filters` by BM25 score against `query`.
    ///
    /// Chunks sharing no term with the query are not returned. An empty query
    /// returns nothing.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Vec<SearchResult> {
        if top_k == 0 || query.trim().is_empty() || self.chunks.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f32, u64, &Chunk)> = self
            .engine
            .search(query, self.chunks.len())
            .into_iter()
            .filter_map(|hit| {
                let (chunk, seq) = self.chunks.get(&hit.document.id)?;
                passes_filter(chunk, filters).then_some((hit.score, *seq, chunk))
            })
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
        results
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new()
    }
}
