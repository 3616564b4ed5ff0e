//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by
//! insertion-ordered vectors protected by a `tokio::sync::RwLock`. It is
//! suitable for tests and throwaway sessions; nothing survives the process.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{EmbeddedPassage, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, cosine_similarity, rank};

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    ids: HashSet<String>,
    /// Insertion order is the tie-break order.
    entries: Vec<EmbeddedPassage>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// # Example
///
/// ```rust,ignore
/// use lingua_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("nlp_documents", 256).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: "InMemory".to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

fn check_dimensions(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RagError::VectorStoreError {
            backend: "InMemory".to_string(),
            message: format!("embedding has {actual} dimensions, collection expects {expected}"),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(name.to_string()).or_insert_with(|| Collection {
            dimensions,
            ids: HashSet::new(),
            entries: Vec::new(),
        });
        check_dimensions(collection.dimensions, dimensions)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, passages: &[EmbeddedPassage]) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        // Validate everything before touching the collection.
        for entry in passages {
            check_dimensions(store.dimensions, entry.embedding.len())?;
        }

        let mut inserted = 0;
        for entry in passages {
            if store.ids.insert(entry.passage.id.clone()) {
                store.entries.push(entry.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        check_dimensions(store.dimensions, embedding.len())?;

        let scored = store
            .entries
            .iter()
            .map(|entry| SearchResult {
                passage: entry.passage.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
            })
            .collect();

        Ok(rank(scored, top_k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(|c| c.entries.len()).ok_or_else(|| missing(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Passage;

    fn entry(content: &str, embedding: Vec<f32>) -> EmbeddedPassage {
        EmbeddedPassage { passage: Passage::new(content, "doc.pdf", 1, 0, 0), embedding }
    }

    #[tokio::test]
    async fn upsert_skips_existing_ids() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let first = entry("syntax", vec![1.0, 0.0]);
        assert_eq!(store.upsert("c", &[first.clone()]).await.unwrap(), 1);
        assert_eq!(store.upsert("c", &[first]).await.unwrap(), 0);
        assert_eq!(store.count("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ties_are_broken_by_insertion_order() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let entries =
            vec![entry("a", vec![0.0, 1.0]), entry("b", vec![1.0, 0.0]), entry("c", vec![1.0, 0.0])];
        store.upsert("c", &entries).await.unwrap();

        let results = store.search("c", &[1.0, 0.0], 3).await.unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.passage.content.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected_without_partial_write() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let entries = vec![entry("ok", vec![1.0, 0.0]), entry("bad", vec![1.0, 0.0, 0.0])];
        assert!(store.upsert("c", &entries).await.is_err());
        assert_eq!(store.count("c").await.unwrap(), 0);
        assert!(store.search("c", &[1.0], 3).await.is_err());
        assert!(store.create_collection("c", 3).await.is_err());
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("nope", &[1.0], 1).await.is_err());
        assert!(store.count("nope").await.is_err());
    }
}
