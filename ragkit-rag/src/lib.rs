//! # ragkit-rag
//!
//! Building blocks for retrieval pipelines: turn documents into chunks, index
//! chunk vectors, and find the most relevant chunks for a query.
//!
//! ## Overview
//!
//! - [`Chunker`] implementations: [`FixedSizeChunker`], [`RecursiveChunker`],
//!   [`SentenceChunker`]
//! - [`EmbeddingProvider`] trait, plus [`CachedEmbedder`] backed by an owned
//!   [`EmbeddingCache`]
//! - [`VectorStore`] trait with [`InMemoryVectorStore`] (exact cosine search,
//!   metadata filters)
//! - [`HybridStore`] fusing vector and BM25 keyword rankings via [`fuse`]
//! - [`RerankedStore`] delegating the final order to a [`Reranker`]
//! - [`Loader`] trait with [`TextFileLoader`]
//! - [`RagPipeline`] tying chunking, embedding and search together
//!
//! Embedders, rerankers and persistent stores are external collaborators;
//! implement the traits to plug them in.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragkit_rag::{Document, InMemoryVectorStore, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::builder().chunk_size(256).chunk_overlap(32).build()?)
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(384)?))
//!     .build()?;
//!
//! pipeline.ingest(&Document::new("guide", guide_text)).await?;
//! for result in pipeline.query("how do I reset my password", None).await? {
//!     println!("{} {:.3} {}", result.rank, result.score, result.chunk.id);
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod hybrid;
pub mod inmemory;
pub mod keyword;
pub mod loader;
pub mod pipeline;
pub mod reranked;
pub mod reranker;
pub mod similarity;
pub mod vectorstore;

pub use cache::{CachedEmbedder, EmbeddingCache, cache_key};
pub use chunking::{
    Chunker, DEFAULT_SEPARATORS, FixedSizeChunker, RecursiveChunker, SentenceChunker,
};
pub use config::{ChunkingStrategy, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, Metadata, MetadataFilter, SearchResult, assign_ranks};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use fusion::{Normalization, fuse};
pub use hybrid::HybridStore;
pub use inmemory::InMemoryVectorStore;
pub use keyword::KeywordIndex;
pub use loader::{Loader, TextFileLoader};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use reranked::{DEFAULT_K_MULTIPLIER, RerankedStore};
pub use reranker::{LexicalReranker, RerankHit, Reranker};
pub use similarity::cosine_similarity;
pub use vectorstore::VectorStore;
