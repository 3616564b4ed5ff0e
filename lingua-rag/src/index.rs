//! The vector index: one named collection plus the embedding provider that
//! fills it.
//!
//! [`VectorIndex`] is an explicitly constructed, explicitly closed handle.
//! It is shared by reference (usually `Arc<VectorIndex>`) between the
//! ingestion pipeline and the retriever. Searches may run concurrently;
//! inserts and resets are serialised by an internal writer lock so batches
//! never interleave.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::document::{EmbeddedPassage, Passage, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Default number of texts per embedding request.
const DEFAULT_BATCH_SIZE: usize = 64;

/// A searchable collection of passages keyed by embedding similarity.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use lingua_rag::{VectorIndex, InMemoryVectorStore, HashingEmbeddingProvider};
///
/// let index = VectorIndex::open(
///     "nlp_documents",
///     Arc::new(HashingEmbeddingProvider::default()),
///     Arc::new(InMemoryVectorStore::new()),
/// )
/// .await?;
/// index.insert(&passages).await?;
/// let hits = index.search("what is a phoneme", 3).await?;
/// index.close().await?;
/// ```
pub struct VectorIndex {
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    writer: Mutex<()>,
    generation: AtomicU64,
}

impl VectorIndex {
    /// Open the named collection, creating it with the embedder's
    /// dimensionality if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable or the collection already exists
    /// with a different dimensionality (a different embedding model).
    pub async fn open(
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(RagError::ConfigError("collection name must not be empty".into()));
        }

        store.create_collection(&collection, embedder.dimensions()).await.map_err(|e| {
            error!(collection = %collection, error = %e, "failed to open collection");
            e
        })?;
        debug!(collection = %collection, dimensions = embedder.dimensions(), "opened vector index");

        Ok(Self {
            collection,
            embedder,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    /// Limit how many texts go to the embedding service per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed and store passages. Passages already present (same id) are
    /// skipped. Returns the number of newly stored passages.
    ///
    /// All embeddings are computed before anything is written, and the write
    /// itself is atomic, so on error nothing from this call is stored.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] or [`RagError::VectorStoreError`]
    /// when the embedding service or the storage backend fails.
    pub async fn insert(&self, passages: &[Passage]) -> Result<usize> {
        if passages.is_empty() {
            return Ok(0);
        }

        let _guard = self.writer.lock().await;

        let mut embedded = Vec::with_capacity(passages.len());
        for batch in passages.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|p| p.content.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
                error!(collection = %self.collection, error = %e, "embedding failed during insert");
                e
            })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: self.embedder.name().to_string(),
                    message: format!(
                        "expected {} embeddings, provider returned {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }

            embedded.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(passage, embedding)| EmbeddedPassage { passage, embedding }),
            );
        }

        let inserted = self.store.upsert(&self.collection, &embedded).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "upsert failed during insert");
            e
        })?;

        info!(
            collection = %self.collection,
            passages = passages.len(),
            inserted,
            "inserted passages"
        );
        Ok(inserted)
    }

    /// Return the `k` passages most similar to `query`, best first, ties in
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] or [`RagError::VectorStoreError`]
    /// when either service is unavailable. An empty collection is not an error.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during search");
            e
        })?;

        let results = self.store.search(&self.collection, &embedding, k).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "vector store search failed");
            e
        })?;

        debug!(collection = %self.collection, result_count = results.len(), "search completed");
        Ok(results)
    }

    /// Number of stored passages.
    pub async fn len(&self) -> Result<usize> {
        self.store.count(&self.collection).await
    }

    /// Whether the collection holds no passages.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Number of resets seen by this handle. Anything derived from the
    /// collection's contents is stale once this changes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Drop every passage in the collection and recreate it empty.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.writer.lock().await;
        self.store.delete_collection(&self.collection).await?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.store.create_collection(&self.collection, self.embedder.dimensions()).await?;
        info!(collection = %self.collection, "reset collection");
        Ok(())
    }

    /// Wait for in-flight writes, then flush and close the backing store.
    pub async fn close(self) -> Result<()> {
        let _guard = self.writer.lock().await;
        self.store.close().await?;
        debug!(collection = %self.collection, "closed vector index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::hashing::HashingEmbeddingProvider;
    use crate::inmemory::InMemoryVectorStore;

    struct DownEmbedder;

    #[async_trait]
    impl EmbeddingProvider for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::EmbeddingError { provider: "down".into(), message: "unreachable".into() })
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    async fn index_with(embedder: Arc<dyn EmbeddingProvider>) -> VectorIndex {
        VectorIndex::open("nlp_documents", embedder, Arc::new(InMemoryVectorStore::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_then_search_returns_stored_passages() {
        let index = index_with(Arc::new(HashingEmbeddingProvider::default())).await;
        let passages = vec![
            Passage::new("Phonemes are contrastive sounds.", "intro.pdf", 1, 0, 0),
            Passage::new("A treebank is a parsed corpus.", "intro.pdf", 2, 0, 0),
        ];
        assert_eq!(index.insert(&passages).await.unwrap(), 2);

        let results = index.search("what is a treebank", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].passage.page, 2);
    }

    #[tokio::test]
    async fn reinserting_identical_passages_is_a_no_op() {
        let index = index_with(Arc::new(HashingEmbeddingProvider::default())).await;
        let passages = vec![Passage::new("Morphology studies words.", "a.pdf", 1, 0, 0)];
        assert_eq!(index.insert(&passages).await.unwrap(), 1);
        assert_eq!(index.insert(&passages).await.unwrap(), 0);
        assert_eq!(index.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn embedding_outage_is_reported_as_unavailable() {
        let index = index_with(Arc::new(DownEmbedder)).await;
        let passages = vec![Passage::new("syntax", "a.pdf", 1, 0, 0)];

        let err = index.insert(&passages).await.unwrap_err();
        assert!(err.is_service_unavailable());
        assert!(index.search("syntax", 3).await.unwrap_err().is_service_unavailable());
        assert!(index.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn reset_empties_the_collection() {
        let index = index_with(Arc::new(HashingEmbeddingProvider::default())).await;
        index.insert(&[Passage::new("corpus", "a.pdf", 1, 0, 0)]).await.unwrap();
        index.reset().await.unwrap();
        assert!(index.is_empty().await.unwrap());
        assert!(index.search("corpus", 3).await.unwrap().is_empty());
        index.close().await.unwrap();
    }

    #[tokio::test]
    async fn batches_are_split_by_batch_size() {
        let index = index_with(Arc::new(HashingEmbeddingProvider::default())).await.with_batch_size(2);
        let passages: Vec<Passage> =
            (0..5).map(|i| Passage::new(format!("passage {i}"), "a.pdf", 1, i, 0)).collect();
        assert_eq!(index.insert(&passages).await.unwrap(), 5);
    }
}
