//! Error types for the `lingua-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting or retrieving passages.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A document could not be read or its text could not be extracted.
    #[error("Parse error ({document}): {message}")]
    ParseError {
        /// Display name of the document that failed.
        document: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Whether this error means the embedding service or the index storage
    /// could not serve the request.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::EmbeddingError { .. } | Self::VectorStoreError { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
