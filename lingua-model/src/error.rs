//! Error types for the `lingua-model` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a generation gateway.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request could not be sent or the connection failed.
    #[error("Request error: {0}")]
    Request(String),

    /// The generation service answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the service.
        message: String,
    },

    /// The response stream broke off or carried an undecodable segment.
    #[error("Stream error: {0}")]
    Stream(String),

    /// A structured response was malformed or missing required fields.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The caller cancelled the generation.
    #[error("Generation cancelled")]
    Cancelled,

    /// No response or stream segment arrived within the configured time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for generation operations.
pub type Result<T> = std::result::Result<T, ModelError>;
