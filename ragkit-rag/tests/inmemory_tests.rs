//! Property tests for in-memory vector store search.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use proptest::prelude::*;
use ragkit_rag::config::RagConfig;
use ragkit_rag::document::{Chunk, Metadata, MetadataFilter, SearchResult};
use ragkit_rag::inmemory::InMemoryVectorStore;
use ragkit_rag::reranked::RerankedStore;
use ragkit_rag::reranker::LexicalReranker;
use ragkit_rag::vectorstore::VectorStore;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk tagged with one of two categories, plus its embedding.
fn arb_entry(dim: usize) -> impl Strategy<Value = (Chunk, Vec<f32>)> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", prop::bool::ANY, arb_normalized_embedding(dim)).prop_map(
        |(id, text, is_a, embedding)| {
            let mut metadata = Metadata::new();
            metadata.insert("category".to_string(), if is_a { "A" } else { "B" }.to_string());
            let chunk = Chunk {
                id,
                text,
                metadata,
                document_id: "doc_1".to_string(),
                position: 0,
            };
            (chunk, embedding)
        },
    )
}

/// Keep the first entry for each id so the store holds exactly these chunks.
fn dedup(entries: Vec<(Chunk, Vec<f32>)>) -> Vec<(Chunk, Vec<f32>)> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    entries.into_iter().filter(|(chunk, _)| seen.insert(chunk.id.clone(), ()).is_none()).collect()
}

async fn populated(dim: usize, entries: &[(Chunk, Vec<f32>)]) -> InMemoryVectorStore {
    let store = InMemoryVectorStore::new(dim).unwrap();
    for (chunk, embedding) in entries {
        store.index(chunk.clone(), embedding.clone()).await.unwrap();
    }
    store
}

fn assert_ranked(results: &[SearchResult]) -> Result<(), TestCaseError> {
    for (i, result) in results.iter().enumerate() {
        prop_assert_eq!(result.rank, i + 1);
    }
    for window in results.windows(2) {
        prop_assert!(
            window[0].score >= window[1].score,
            "results not in descending order: {} < {}",
            window[0].score,
            window[1].score,
        );
    }
    Ok(())
}

/// **Property: search ordering**
/// *For any* set of indexed chunks, searching returns results ordered by
/// descending cosine similarity, ranked from 1, and at most `top_k` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            entries in proptest::collection::vec(arb_entry(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let entries = dedup(entries);
            let unique_count = entries.len();
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = populated(DIM, &entries).await;
                store.search(&query, top_k, None).await.unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert_eq!(results.len(), top_k.min(unique_count));
            assert_ranked(&results)?;
        }
    }
}

/// **Property: filtered search**
/// *For any* store and filter, every returned chunk matches the filter and the
/// results are still correctly ranked.
mod prop_inmemory_filtered_search {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn filtered_results_only_contain_matching_chunks(
            entries in proptest::collection::vec(arb_entry(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            want_a in prop::bool::ANY,
        ) {
            let entries = dedup(entries);
            let category = if want_a { "A" } else { "B" };
            let expected = entries
                .iter()
                .filter(|(c, _)| c.metadata.get("category").map(String::as_str) == Some(category))
                .count();
            let filter: MetadataFilter = [("category".to_string(), category.to_string())].into();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = populated(DIM, &entries).await;
                store.search(&query, 100, Some(&filter)).await.unwrap()
            });

            prop_assert_eq!(results.len(), expected);
            for result in &results {
                prop_assert_eq!(result.chunk.metadata.get("category").map(String::as_str), Some(category));
            }
            assert_ranked(&results)?;
        }
    }
}

/// **Property: update idempotence**
/// Updating a chunk twice with the same vector leaves the store exactly as a
/// single update does.
mod prop_inmemory_update_idempotent {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn update_twice_equals_once(
            entries in proptest::collection::vec(arb_entry(DIM), 1..10),
            replacement in arb_normalized_embedding(DIM),
            query in arb_normalized_embedding(DIM),
        ) {
            let entries = dedup(entries);
            let mut target = entries[0].0.clone();
            target.text = "updated text".to_string();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let (once, twice, len_once, len_twice) = rt.block_on(async {
                let a = populated(DIM, &entries).await;
                a.update(target.clone(), replacement.clone()).await.unwrap();
                let b = populated(DIM, &entries).await;
                b.update(target.clone(), replacement.clone()).await.unwrap();
                b.update(target.clone(), replacement.clone()).await.unwrap();
                (
                    a.search(&query, 100, None).await.unwrap(),
                    b.search(&query, 100, None).await.unwrap(),
                    a.len().await,
                    b.len().await,
                )
            });

            prop_assert_eq!(len_once, len_twice);
            prop_assert_eq!(once, twice);
        }
    }
}

/// Counts how many candidates each search asks the wrapped store for.
struct CountingStore {
    inner: InMemoryVectorStore,
    last_top_k: AtomicUsize,
}

#[async_trait]
impl VectorStore for CountingStore {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn index(&self, chunk: Chunk, vector: Vec<f32>) -> ragkit_rag::Result<()> {
        self.inner.index(chunk, vector).await
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> ragkit_rag::Result<Vec<SearchResult>> {
        self.last_top_k.store(top_k, Ordering::SeqCst);
        self.inner.search(query, top_k, filters).await
    }

    async fn delete(&self, chunk_id: &str) -> ragkit_rag::Result<()> {
        self.inner.delete(chunk_id).await
    }

    async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[tokio::test]
async fn reranked_search_over_fetches_by_multiplier() {
    let base = CountingStore { inner: InMemoryVectorStore::new(2).unwrap(), last_top_k: AtomicUsize::new(0) };
    for i in 0..10 {
        let chunk = Chunk {
            id: format!("c{i}"),
            document_id: "doc".to_string(),
            text: format!("chunk number {i}"),
            metadata: Metadata::new(),
            position: i,
        };
        base.index(chunk, vec![1.0, i as f32 / 10.0]).await.unwrap();
    }

    let store = RerankedStore::new(base, Arc::new(LexicalReranker), 3).unwrap();
    let results = store.search_with_query(Some("chunk number"), &[1.0, 0.0], 2, None).await.unwrap();

    assert_eq!(store.base().last_top_k.load(Ordering::SeqCst), 6);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[1].rank, 2);
}

#[tokio::test]
async fn reranked_store_from_config_uses_rerank_multiplier() {
    let base = CountingStore { inner: InMemoryVectorStore::new(2).unwrap(), last_top_k: AtomicUsize::new(0) };
    let config = RagConfig::builder().rerank_multiplier(4).build().unwrap();
    let store = RerankedStore::from_config(base, Arc::new(LexicalReranker), &config).unwrap();
    assert_eq!(store.k_multiplier(), 4);

    store.search_with_query(Some("anything"), &[1.0, 0.0], 3, None).await.unwrap();
    assert_eq!(store.base().last_top_k.load(Ordering::SeqCst), 12);
}

fn plain_chunk(id: &str, text: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        document_id: "doc".to_string(),
        text: text.to_string(),
        metadata: Metadata::new(),
        position: 0,
    }
}

/// Concurrent searches must never observe an updated chunk as missing.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn update_is_atomic_with_respect_to_search() {
    let store = Arc::new(InMemoryVectorStore::new(2).unwrap());
    store.index(plain_chunk("a", "first"), vec![1.0, 0.0]).await.unwrap();
    store.index(plain_chunk("b", "second"), vec![0.0, 1.0]).await.unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..3 {
        let store = Arc::clone(&store);
        let stop = Arc::clone(&stop);
        readers.push(tokio::spawn(async move {
            let mut missing = 0usize;
            while !stop.load(Ordering::SeqCst) {
                let results = store.search(&[1.0, 0.0], 5, None).await.unwrap();
                if !results.iter().any(|r| r.chunk.id == "a") {
                    missing += 1;
                }
                tokio::task::yield_now().await;
            }
            missing
        }));
    }

    for i in 0..5_000 {
        store.update(plain_chunk("a", &format!("revision {i}")), vec![1.0, 0.0]).await.unwrap();
        if i % 16 == 0 {
            tokio::task::yield_now().await;
        }
    }
    stop.store(true, Ordering::SeqCst);

    for reader in readers {
        assert_eq!(reader.await.unwrap(), 0);
    }
    assert_eq!(store.len().await, 2);
    assert_eq!(store.get("a").await.map(|c| c.text), Some("revision 4999".to_string()));
}
