//! # lingua-rag
//!
//! Document ingestion, vector indexing and retrieval for the lingua NLP
//! study assistant.
//!
//! ## Overview
//!
//! Ingestion turns uploaded documents into searchable passages:
//!
//! - [`DocumentParser`] - extracts and normalises page text ([`PdfParser`], [`PlainTextParser`])
//! - [`RelevanceFilter`] - admits only documents about NLP or linguistics
//! - [`RecursiveChunker`] - cuts pages into overlapping passages that keep their citation
//! - [`EmbeddingProvider`] - maps text to vectors ([`OpenAIEmbeddingProvider`], [`HashingEmbeddingProvider`])
//! - [`VectorStore`] - persists embedded passages ([`SqliteVectorStore`], [`InMemoryVectorStore`])
//! - [`VectorIndex`] - one collection plus its embedder, shared by ingestion and retrieval
//! - [`IngestPipeline`] - runs a batch end to end and reports per-document outcomes
//!
//! At query time [`Retriever`] returns the top passages and [`assemble_context`]
//! renders them with `[Source: ..., Page: ...]` citations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lingua_rag::*;
//!
//! let index = Arc::new(
//!     VectorIndex::open(
//!         DEFAULT_COLLECTION,
//!         Arc::new(HashingEmbeddingProvider::default()),
//!         Arc::new(InMemoryVectorStore::new()),
//!     )
//!     .await?,
//! );
//!
//! let pipeline = IngestPipeline::builder().index(index.clone()).build()?;
//! pipeline.ingest(vec![RawDocument::new("intro.txt", "Syntax is the study of sentence structure.")]).await?;
//!
//! let result = Retriever::new(Some(index)).retrieve("what is syntax").await;
//! println!("{}", assemble_context(result.passages()));
//! ```
//!
//! ## Features
//!
//! - `openai` (default) - OpenAI embeddings over HTTP
//! - `pdf` (default) - PDF text extraction
//! - `sqlite` (default) - persistent SQLite vector store

pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod hashing;
pub mod index;
pub mod inmemory;
pub mod parser;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use chunking::{Chunker, DEFAULT_SEPARATORS, RecursiveChunker};
pub use config::{DEFAULT_COLLECTION, RagConfig, RagConfigBuilder};
pub use context::{assemble_context, format_passage};
pub use document::{EmbeddedPassage, Page, Passage, RawDocument, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use filter::{NLP_KEYWORDS, RelevanceFilter};
pub use hashing::HashingEmbeddingProvider;
pub use index::VectorIndex;
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "pdf")]
pub use parser::PdfParser;
pub use parser::{DocumentParser, ExtensionParser, PlainTextParser, normalize_page_text};
pub use pipeline::{
    DocumentOutcome, DocumentReport, IngestError, IngestPipeline, IngestPipelineBuilder,
    IngestReport, RejectReason,
};
pub use retriever::{
    DEFAULT_TOP_K, RetrievalResult, RetrievalStatus, RetrievedPassage, Retriever,
};
pub use vectorstore::VectorStore;

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteVectorStore;
