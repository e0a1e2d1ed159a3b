//! End-to-end tests for `RagPipeline` with a deterministic embedder.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ragkit_rag::{
    CachedEmbedder, ChunkingStrategy, Document, EmbeddingCache, EmbeddingProvider, HybridStore,
    InMemoryVectorStore, LexicalReranker, MetadataFilter, RagConfig, RagError, RagPipeline,
    RerankedStore, Result, VectorStore,
};

const VOCAB: [&str; 6] = ["rust", "python", "memory", "garbage", "ownership", "interpreter"];

/// Bag-of-words embedder over a fixed vocabulary.
struct VocabEmbedder {
    calls: AtomicUsize,
}

impl VocabEmbedder {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for VocabEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        Ok(VOCAB.iter().map(|w| lower.matches(w).count() as f32).collect())
    }

    fn dimensions(&self) -> usize {
        VOCAB.len()
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError {
            provider: "failing".to_string(),
            message: "service unavailable".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        VOCAB.len()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn config() -> RagConfig {
    RagConfig::builder()
        .chunk_size(60)
        .chunk_overlap(0)
        .chunking_strategy(ChunkingStrategy::Sentence)
        .top_k(3)
        .build()
        .unwrap()
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new("rust-book", "Rust manages memory through ownership. No garbage collector runs.")
            .with_metadata("lang", "rust"),
        Document::new("py-guide", "Python uses an interpreter. Python memory is garbage collected.")
            .with_metadata("lang", "python"),
    ]
}

fn pipeline_with(store: Arc<dyn VectorStore>) -> RagPipeline {
    RagPipeline::builder()
        .config(config())
        .embedding_provider(Arc::new(VocabEmbedder::new()))
        .vector_store(store)
        .build()
        .unwrap()
}

#[tokio::test]
async fn ingest_then_query_ranks_relevant_chunks_first() {
    init_tracing();
    let store = Arc::new(InMemoryVectorStore::new(VOCAB.len()).unwrap());
    let pipeline = pipeline_with(store.clone());

    let chunks = pipeline.ingest_batch(&corpus()).await.unwrap();
    assert_eq!(chunks.len(), 4);
    assert_eq!(store.len().await, 4);
    assert_eq!(chunks[0].id, "rust-book_chunk_0");
    assert_eq!(chunks[0].metadata.get("lang").map(String::as_str), Some("rust"));

    let results = pipeline.query("rust ownership", None).await.unwrap();
    assert_eq!(results[0].chunk.id, "rust-book_chunk_0");
    assert!(results.len() <= 3);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.rank, i + 1);
    }
}

#[tokio::test]
async fn query_applies_filters_and_threshold() {
    let store = Arc::new(InMemoryVectorStore::new(VOCAB.len()).unwrap());
    let pipeline = RagPipeline::builder()
        .config(RagConfig::builder().chunk_size(60).chunk_overlap(0).similarity_threshold(0.1).build().unwrap())
        .embedding_provider(Arc::new(VocabEmbedder::new()))
        .vector_store(store)
        .chunker(Arc::new(ragkit_rag::SentenceChunker::new(60).unwrap()))
        .build()
        .unwrap();
    pipeline.ingest_batch(&corpus()).await.unwrap();

    let filter: MetadataFilter = [("lang".to_string(), "python".to_string())].into();
    let results = pipeline.query("garbage memory", Some(&filter)).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.chunk.document_id == "py-guide"));
    assert!(results.iter().all(|r| r.score >= 0.1));

    // "interpreter" chunk shares no vocabulary with the query and scores 0
    assert!(results.iter().all(|r| !r.chunk.text.contains("interpreter")));
}

#[tokio::test]
async fn empty_document_yields_no_chunks() {
    let store = Arc::new(InMemoryVectorStore::new(VOCAB.len()).unwrap());
    let pipeline = pipeline_with(store.clone());
    let chunks = pipeline.ingest(&Document::new("empty", "")).await.unwrap();
    assert!(chunks.is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn embedder_failure_propagates_unchanged() {
    let pipeline = RagPipeline::builder()
        .config(config())
        .embedding_provider(Arc::new(FailingEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new(VOCAB.len()).unwrap()))
        .build()
        .unwrap();

    let err = pipeline.ingest(&corpus()[0]).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));
    let err = pipeline.query("rust", None).await.unwrap_err();
    assert!(err.is_external());
}

#[test]
fn builder_rejects_dimension_mismatch_and_missing_fields() {
    let err = RagPipeline::builder()
        .config(config())
        .embedding_provider(Arc::new(VocabEmbedder::new()))
        .vector_store(Arc::new(InMemoryVectorStore::new(3).unwrap()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 6 }));

    let err = RagPipeline::builder().config(config()).build().err().unwrap();
    assert!(err.is_config_error());
}

#[tokio::test]
async fn decorated_stores_plug_into_the_pipeline() {
    let hybrid = HybridStore::new(InMemoryVectorStore::new(VOCAB.len()).unwrap());
    let reranked = RerankedStore::new(hybrid, Arc::new(LexicalReranker), 2).unwrap();
    let pipeline = pipeline_with(Arc::new(reranked));
    pipeline.ingest_batch(&corpus()).await.unwrap();

    let results = pipeline.query("python interpreter", None).await.unwrap();
    assert_eq!(results[0].chunk.id, "py-guide_chunk_0");
    assert!(results.len() <= 3);
}

#[tokio::test]
async fn cached_embedder_avoids_repeat_calls() {
    let cached = Arc::new(CachedEmbedder::new(VocabEmbedder::new(), EmbeddingCache::new()));
    let pipeline = RagPipeline::builder()
        .config(config())
        .embedding_provider(cached.clone())
        .vector_store(Arc::new(InMemoryVectorStore::new(VOCAB.len()).unwrap()))
        .build()
        .unwrap();

    pipeline.ingest(&corpus()[0]).await.unwrap();
    let after_first = cached.inner().calls.load(Ordering::SeqCst);
    pipeline.ingest(&corpus()[0]).await.unwrap();
    assert_eq!(cached.inner().calls.load(Ordering::SeqCst), after_first);
    assert_eq!(cached.cache().len().await, 2);
}
