//! Concurrent use of one shared index.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lingua_rag::{
    EmbeddedPassage, HashingEmbeddingProvider, InMemoryVectorStore, Passage, Result, SearchResult,
    VectorIndex, VectorStore,
};

/// Wraps an in-memory store and records when each upsert starts and ends.
/// Upserts yield mid-write so an unserialised caller would interleave.
struct RecordingStore {
    inner: InMemoryVectorStore,
    events: Mutex<Vec<(String, &'static str)>>,
}

impl RecordingStore {
    fn new() -> Self {
        Self { inner: InMemoryVectorStore::new(), events: Mutex::new(Vec::new()) }
    }

    fn record(&self, source: &str, event: &'static str) {
        self.events.lock().unwrap().push((source.to_string(), event));
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.create_collection(name, dimensions).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }

    async fn upsert(&self, collection: &str, passages: &[EmbeddedPassage]) -> Result<usize> {
        let source = passages.first().map(|p| p.passage.source.clone()).unwrap_or_default();
        self.record(&source, "start");
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let stored = self.inner.upsert(collection, passages).await;
        self.record(&source, "end");
        stored
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        tokio::task::yield_now().await;
        self.inner.search(collection, embedding, top_k).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }
}

/// `size` passages from `source`, all with the same text.
fn batch(source: &str, size: usize) -> Vec<Passage> {
    (0..size).map(|i| Passage::new("syntax trees and parsing", source, 1, i, 0)).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_are_serialised_and_searches_proceed() {
    let store = Arc::new(RecordingStore::new());
    let index = Arc::new(
        VectorIndex::open("nlp_documents", Arc::new(HashingEmbeddingProvider::default()), store.clone())
            .await
            .unwrap()
            .with_batch_size(3),
    );

    let (batch_a, batch_b, batch_c) = (batch("a.pdf", 20), batch("b.pdf", 20), batch("c.pdf", 20));
    let (a, b, c, hits) = tokio::join!(
        index.insert(&batch_a),
        index.insert(&batch_b),
        index.insert(&batch_c),
        index.search("syntax", 3),
    );
    assert_eq!(a.unwrap() + b.unwrap() + c.unwrap(), 60);
    assert!(hits.unwrap().len() <= 3);
    assert_eq!(index.len().await.unwrap(), 60);

    let events = store.events.lock().unwrap().clone();
    assert_eq!(events.len(), 6);
    for pair in events.chunks(2) {
        assert_eq!(pair[0].1, "start");
        assert_eq!(pair[1].1, "end");
        assert_eq!(pair[0].0, pair[1].0, "upserts interleaved: {events:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn passages_of_one_batch_are_stored_contiguously() {
    let index = Arc::new(
        VectorIndex::open(
            "nlp_documents",
            Arc::new(HashingEmbeddingProvider::default()),
            Arc::new(InMemoryVectorStore::new()),
        )
        .await
        .unwrap(),
    );

    let first = index.clone();
    let second = index.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.insert(&batch("a.pdf", 25)).await }),
        tokio::spawn(async move { second.insert(&batch("b.pdf", 25)).await }),
    );
    assert_eq!(a.unwrap().unwrap(), 25);
    assert_eq!(b.unwrap().unwrap(), 25);

    // All passages have the same text, so scores tie and results come back
    // in storage order.
    let results = index.search("syntax", 50).await.unwrap();
    assert_eq!(results.len(), 50);
    let sources: Vec<&str> = results.iter().map(|r| r.passage.source.as_str()).collect();
    let switches = sources.windows(2).filter(|w| w[0] != w[1]).count();
    assert_eq!(switches, 1, "batches interleaved in storage: {sources:?}");
}
