//! Reranker trait for second-pass reordering of candidate texts.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One entry of a reranker's output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankHit {
    /// Position of the document in the list passed to [`Reranker::rerank`].
    pub index: usize,
    /// The reranker's relevance score (higher is more relevant).
    pub score: f32,
}

/// A reranker that scores candidate texts against a query.
///
/// Implementations can use cross-encoder models, LLM-based scoring, or other
/// strategies to improve precision beyond initial vector similarity. Remote
/// rerankers report failures as
/// [`RagError::RerankerError`](crate::RagError::RerankerError).
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Return at most `top_k` hits ordered by preference, each pointing back
    /// into `documents` by index.
    async fn rerank(&self, query: &str, documents: &[&str], top_k: usize) -> Result<Vec<RerankHit>>;
}

/// A local reranker scoring each document by the fraction of distinct query
/// terms it contains.
///
/// Terms are lowercased alphanumeric runs longer than two characters. Ties
/// keep the candidates' original order.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_rag::{LexicalReranker, Reranker};
///
/// let hits = LexicalReranker.rerank("vector search", &["cooking", "vector search engine"], 1).await?;
/// assert_eq!(hits[0].index, 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalReranker;

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl Reranker for LexicalReranker {
    async fn rerank(&self, query: &str, documents: &[&str], top_k: usize) -> Result<Vec<RerankHit>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(documents
                .iter()
                .enumerate()
                .take(top_k)
                .map(|(index, _)| RerankHit { index, score: 0.0 })
                .collect());
        }

        let mut hits: Vec<RerankHit> = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let doc_terms = terms(doc);
                let matched = query_terms.intersection(&doc_terms).count();
                RerankHit { index, score: matched as f32 / query_terms.len() as f32 }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefers_documents_covering_more_terms() {
        let docs = ["tokio runtime", "python scripting", "the tokio async runtime scheduler"];
        let hits = LexicalReranker.rerank("tokio runtime scheduler", &docs, 3).await.unwrap();

        assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), [2, 0, 1]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[2].score, 0.0);
    }

    #[tokio::test]
    async fn output_is_bounded_by_top_k() {
        let docs = ["a b c", "d e f", "g h i"];
        let hits = LexicalReranker.rerank("anything", &docs, 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 0);
    }
}
