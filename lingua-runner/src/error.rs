//! Error types for the `lingua-runner` crate.

use lingua_model::ModelError;
use thiserror::Error;

/// Errors returned by the chat and study-material flows.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The question or topic was blank.
    #[error("input must not be empty")]
    EmptyInput,

    /// The topic does not mention any natural language processing or
    /// linguistics term.
    #[error("topic '{topic}' is not about natural language processing or linguistics")]
    OffTopic {
        /// The rejected topic.
        topic: String,
    },

    /// The generation service failed, was cancelled, or returned an invalid record.
    #[error(transparent)]
    Generation(#[from] ModelError),
}

impl RunnerError {
    /// Whether the caller cancelled the generation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Generation(ModelError::Cancelled))
    }
}

/// A convenience result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
