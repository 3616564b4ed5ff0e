//! Ingestion pipeline: parse → admit → chunk → insert.
//!
//! [`IngestPipeline`] processes a batch of uploaded documents against one
//! [`VectorIndex`]. Per-document problems (unreadable input, off-domain
//! content) reject that document and the batch carries on. A failure of the
//! embedding service or the store fails the whole batch, and because the
//! index embeds everything before a single atomic write, nothing from a
//! failed batch is stored.
//!
//! Documents are cached by the SHA-256 of their bytes. Submitting the same
//! bytes again reports [`DocumentOutcome::Cached`] without re-parsing or
//! re-embedding anything. The cache is dropped whenever the index has been
//! reset since it was filled.
//!
//! # Example
//!
//! ```rust,ignore
//! use lingua_rag::{IngestPipeline, RagConfig, RawDocument};
//!
//! let pipeline = IngestPipeline::builder()
//!     .config(RagConfig::default())
//!     .index(index.clone())
//!     .build()?;
//!
//! let report = pipeline.ingest(vec![RawDocument::new("intro.pdf", bytes)]).await?;
//! for name in report.flagged() {
//!     println!("flagged: {name}");
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Passage, RawDocument};
use crate::error::{RagError, Result};
use crate::filter::RelevanceFilter;
use crate::index::VectorIndex;
use crate::parser::{DocumentParser, ExtensionParser};

/// Why a document was kept out of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The document could not be read.
    ParseFailed(String),
    /// The document has no domain keyword on any page.
    NotRelevant,
}

/// What happened to one document of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentOutcome {
    /// Passages were cut from the document and written.
    Admitted {
        /// Number of passages cut from the document.
        passages: usize,
    },
    /// The document was excluded.
    Rejected(RejectReason),
    /// Identical bytes were processed before; carries the earlier outcome.
    Cached(Box<DocumentOutcome>),
}

impl DocumentOutcome {
    /// Whether the document (or its cached predecessor) was rejected.
    pub fn is_rejected(&self) -> bool {
        match self {
            Self::Rejected(_) => true,
            Self::Cached(previous) => previous.is_rejected(),
            Self::Admitted { .. } => false,
        }
    }
}

/// Outcome for one named document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Display name the document was uploaded under.
    pub name: String,
    /// SHA-256 of the document bytes.
    pub content_hash: String,
    /// What happened to it.
    pub outcome: DocumentOutcome,
}

/// Per-document results of one [`IngestPipeline::ingest`] call, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// One entry per submitted document.
    pub documents: Vec<DocumentReport>,
    /// Passages newly written by this call. Passages already in the index
    /// are not counted.
    pub inserted: usize,
}

impl IngestReport {
    /// Names of documents that contributed passages in this call.
    pub fn admitted(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Admitted { .. }))
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Names of rejected documents, including cached rejections.
    pub fn flagged(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|d| d.outcome.is_rejected())
            .map(|d| d.name.as_str())
            .collect()
    }
}

/// A failed batch: the storage error plus what was decided for each document
/// before the failure. Nothing from the batch was written.
#[derive(Debug, thiserror::Error)]
#[error("ingestion batch failed, nothing was written: {source}")]
pub struct IngestError {
    /// The embedding or storage failure.
    #[source]
    pub source: RagError,
    /// Documents that were rejected or cached before the write was attempted.
    pub report: IngestReport,
}

/// Orchestrates ingestion into one [`VectorIndex`].
pub struct IngestPipeline {
    index: Arc<VectorIndex>,
    parser: Arc<dyn DocumentParser>,
    filter: Arc<RelevanceFilter>,
    chunker: Arc<dyn Chunker>,
    cache: Mutex<OutcomeCache>,
}

/// Outcomes of committed batches, valid for one index generation.
struct OutcomeCache {
    generation: u64,
    outcomes: HashMap<String, DocumentOutcome>,
}

impl OutcomeCache {
    /// Forget everything recorded before the index was last reset.
    fn sync_with(&mut self, index: &VectorIndex) {
        let generation = index.generation();
        if generation != self.generation {
            info!(collection = %index.collection(), "index was reset, clearing document cache");
            self.outcomes.clear();
            self.generation = generation;
        }
    }
}

impl IngestPipeline {
    /// Create a new [`IngestPipelineBuilder`].
    pub fn builder() -> IngestPipelineBuilder {
        IngestPipelineBuilder::default()
    }

    /// The index this pipeline writes to.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// The relevance filter used for admission.
    pub fn filter(&self) -> &Arc<RelevanceFilter> {
        &self.filter
    }

    /// Ingest a batch of documents.
    ///
    /// Runs to completion before returning: when it returns `Ok`, every
    /// admitted passage is durably stored and searchable.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the embedding service or the store fails.
    /// The batch is then rolled back as a whole and no cache entries are recorded.
    pub async fn ingest(
        &self,
        documents: Vec<RawDocument>,
    ) -> std::result::Result<IngestReport, IngestError> {
        let mut cache = self.cache.lock().await;
        cache.sync_with(&self.index);

        let mut report = IngestReport::default();
        let mut pending: Vec<Passage> = Vec::new();
        let mut fresh: HashMap<String, DocumentOutcome> = HashMap::new();

        for document in &documents {
            let content_hash = document.content_hash();

            let outcome = if let Some(previous) =
                cache.outcomes.get(&content_hash).or_else(|| fresh.get(&content_hash))
            {
                info!(document = %document.name, "document unchanged, skipping");
                DocumentOutcome::Cached(Box::new(previous.clone()))
            } else {
                let outcome = match self.prepare(document) {
                    Ok(passages) => {
                        let count = passages.len();
                        pending.extend(passages);
                        DocumentOutcome::Admitted { passages: count }
                    }
                    Err(reason) => DocumentOutcome::Rejected(reason),
                };
                fresh.insert(content_hash.clone(), outcome.clone());
                outcome
            };

            report.documents.push(DocumentReport {
                name: document.name.clone(),
                content_hash,
                outcome,
            });
        }

        match self.index.insert(&pending).await {
            Ok(inserted) => report.inserted = inserted,
            Err(source) => {
                error!(error = %source, passages = pending.len(), "ingestion batch failed");
                // Only rejections and outcomes of earlier committed batches
                // still hold; admitted documents and their in-batch copies
                // were not written.
                report.documents.retain(|d| {
                    d.outcome.is_rejected() || cache.outcomes.contains_key(&d.content_hash)
                });
                return Err(IngestError { source, report });
            }
        }

        // A reset racing this batch may have wiped what was just written.
        if self.index.generation() == cache.generation {
            cache.outcomes.extend(fresh);
        }

        info!(
            documents = report.documents.len(),
            admitted = report.admitted().len(),
            flagged = report.flagged().len(),
            inserted = report.inserted,
            "ingested batch"
        );
        Ok(report)
    }

    /// Parse, admit and chunk one document.
    fn prepare(&self, document: &RawDocument) -> std::result::Result<Vec<Passage>, RejectReason> {
        let pages = self.parser.parse(document).map_err(|e| {
            warn!(document = %document.name, error = %e, "document rejected: unreadable");
            RejectReason::ParseFailed(e.to_string())
        })?;

        if !self.filter.admits(&pages) {
            info!(document = %document.name, "document rejected: not relevant");
            return Err(RejectReason::NotRelevant);
        }

        let passages = self.chunker.chunk_pages(&pages);
        info!(document = %document.name, pages = pages.len(), passages = passages.len(), "document admitted");
        Ok(passages)
    }
}

/// Builder for constructing an [`IngestPipeline`].
///
/// Only the index is required. The parser defaults to [`ExtensionParser`],
/// the filter to the canonical NLP keyword set, and the chunker to a
/// [`RecursiveChunker`] sized from the config.
#[derive(Default)]
pub struct IngestPipelineBuilder {
    config: Option<RagConfig>,
    index: Option<Arc<VectorIndex>>,
    parser: Option<Arc<dyn DocumentParser>>,
    filter: Option<Arc<RelevanceFilter>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IngestPipelineBuilder {
    /// Set the configuration used for the default chunker.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the index to write to.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the document parser.
    pub fn parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Set the relevance filter.
    pub fn filter(mut self, filter: Arc<RelevanceFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`IngestPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the index is missing or the config is invalid.
    pub fn build(self) -> Result<IngestPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });

        let index_generation = index.generation();
        Ok(IngestPipeline {
            index,
            parser: self.parser.unwrap_or_else(|| Arc::new(ExtensionParser)),
            filter: self.filter.unwrap_or_default(),
            chunker,
            cache: Mutex::new(OutcomeCache {
                generation: index_generation,
                outcomes: HashMap::new(),
            }),
        })
    }
}
