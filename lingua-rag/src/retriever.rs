//! Query-time retrieval with graceful degradation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::Passage;
use crate::index::VectorIndex;

/// Default number of passages retrieved per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Why a retrieval returned what it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalStatus {
    /// At least one passage was found.
    Grounded,
    /// The index answered but holds nothing close to the query.
    NoMatches,
    /// No index is configured, or the index or embedding service failed.
    IndexUnavailable,
}

/// One retrieved passage with its 1-based rank and similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// The stored passage.
    pub passage: Passage,
    /// 1-based position in the result list.
    pub rank: usize,
    /// Similarity score, higher is closer.
    pub score: f32,
}

/// Ordered passages for one query, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// At most `k` passages.
    pub passages: Vec<RetrievedPassage>,
    /// How the result came about.
    pub status: RetrievalStatus,
}

impl RetrievalResult {
    fn unavailable() -> Self {
        Self { passages: Vec::new(), status: RetrievalStatus::IndexUnavailable }
    }

    /// Whether no passages were retrieved.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// The retrieved passages without rank and score.
    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.passages.iter().map(|p| &p.passage)
    }
}

/// Returns the top-`k` passages for a query.
///
/// Retrieval never fails: an absent or broken index yields an empty result
/// with [`RetrievalStatus::IndexUnavailable`] so answering can proceed
/// ungrounded.
#[derive(Clone)]
pub struct Retriever {
    index: Option<Arc<VectorIndex>>,
    k: usize,
}

impl Retriever {
    /// Create a retriever over `index` returning [`DEFAULT_TOP_K`] passages.
    pub fn new(index: Option<Arc<VectorIndex>>) -> Self {
        Self { index, k: DEFAULT_TOP_K }
    }

    /// Set how many passages to return.
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// The configured result size.
    pub fn top_k(&self) -> usize {
        self.k
    }

    /// Whether an index is configured.
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Retrieve passages for `query`.
    pub async fn retrieve(&self, query: &str) -> RetrievalResult {
        let Some(index) = &self.index else {
            debug!("no index configured, answering without context");
            return RetrievalResult::unavailable();
        };

        match index.search(query, self.k).await {
            Ok(results) => {
                let passages: Vec<RetrievedPassage> = results
                    .into_iter()
                    .enumerate()
                    .map(|(i, r)| RetrievedPassage { passage: r.passage, rank: i + 1, score: r.score })
                    .collect();
                let status = if passages.is_empty() {
                    RetrievalStatus::NoMatches
                } else {
                    RetrievalStatus::Grounded
                };
                debug!(retrieved = passages.len(), ?status, "retrieval completed");
                RetrievalResult { passages, status }
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed, answering without context");
                RetrievalResult::unavailable()
            }
        }
    }
}
