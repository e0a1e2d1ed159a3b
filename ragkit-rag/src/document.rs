//! Data types for documents, chunks, and search results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered key-value metadata attached to documents and chunks.
pub type Metadata = BTreeMap<String, String>;

/// Exact-match metadata filters: a chunk matches when every key is present in
/// its metadata with an equal value.
pub type MetadataFilter = BTreeMap<String, String>;

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The full text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: Metadata,
    /// Where the document came from (path, URL, ...).
    #[serde(default)]
    pub source: String,
}

impl Document {
    /// Create a document with empty metadata and source.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Metadata::new(), source: String::new() }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the origin descriptor.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// A positioned segment of a [`Document`].
///
/// Chunks carry no embedding; vectors are associated with chunks by the
/// [`VectorStore`](crate::VectorStore) at index time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_chunk_{position}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    #[serde(default)]
    pub metadata: Metadata,
    /// 0-based position of the chunk within its parent document.
    pub position: usize,
}

impl Chunk {
    /// Build the canonical chunk id for a document position.
    pub fn make_id(document_id: &str, position: usize) -> String {
        format!("{document_id}_chunk_{position}")
    }

    /// Returns `true` if every filter entry is present in this chunk's
    /// metadata with an equal value. An empty filter matches everything.
    pub fn matches(&self, filter: &MetadataFilter) -> bool {
        filter.iter().all(|(key, value)| self.metadata.get(key) == Some(value))
    }
}

/// Optional-filter form of [`Chunk::matches`].
pub(crate) fn passes_filter(chunk: &Chunk, filter: Option<&MetadataFilter>) -> bool {
    filter.is_none_or(|f| chunk.matches(f))
}

/// A retrieved [`Chunk`] paired with a relevance score and its rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The relevance score (higher is more relevant).
    pub score: f32,
    /// 1-based position in the returned list.
    pub rank: usize,
}

/// Reassign ranks so that each result's rank equals its index + 1.
pub fn assign_ranks(results: &mut [SearchResult]) {
    for (i, result) in results.iter_mut().enumerate() {
        result.rank = i + 1;
    }
}
