//! Vector store trait for storing and searching passage embeddings.

use async_trait::async_trait;

use crate::document::{EmbeddedPassage, SearchResult};
use crate::error::Result;

/// A storage backend for passage embeddings with similarity search.
///
/// Implementations manage named collections of fixed dimensionality. Writes
/// are insert-if-absent keyed by [`Passage::id`](crate::Passage::id), so
/// storing the same passage twice leaves one copy. Every stored passage gets
/// an insertion sequence number that breaks score ties in [`search`].
///
/// [`search`]: VectorStore::search
///
/// # Example
///
/// ```rust,ignore
/// use lingua_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("nlp_documents", 256).await?;
/// store.upsert("nlp_documents", &passages).await?;
/// let results = store.search("nlp_documents", &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists with the same
    /// dimensions; an error if it exists with different dimensions.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Store passages that are not yet present. All-or-nothing: either every
    /// new passage is stored or none is. Returns the number newly stored.
    async fn upsert(&self, collection: &str, passages: &[EmbeddedPassage]) -> Result<usize>;

    /// Return the `top_k` passages most similar to `embedding`, ordered by
    /// descending score, ties broken by insertion order (earliest first).
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of passages in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Flush and release backend resources. The store must not be used afterwards.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Cosine similarity between two vectors; 0.0 if either has zero magnitude
/// or the lengths differ.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Sort by descending score. The sort is stable, so callers that feed
/// results in insertion order get earliest-first tie breaking.
pub(crate) fn rank(mut scored: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    scored
}
