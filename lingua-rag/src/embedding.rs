//! The embedding service seam.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into fixed-size vectors.
///
/// Passages and the queries searched against them must be embedded by the
/// same provider; the index fixes a collection's dimensionality when the
/// collection is created and the stores reject vectors of any other size.
///
/// ```rust,ignore
/// use lingua_rag::{EmbeddingProvider, HashingEmbeddingProvider};
///
/// let provider = HashingEmbeddingProvider::default();
/// let vector = provider.embed("what is a morpheme").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str {
        "embedding"
    }

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per input in input order.
    ///
    /// Falls back to one [`embed`](EmbeddingProvider::embed) call per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}
