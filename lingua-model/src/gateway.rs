//! The generation gateway contract.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::message::Message;
use crate::study::StudyMaterial;

/// Prefix of the system message that carries retrieved evidence.
pub const CONTEXT_PREFIX: &str = "Context from documents:\n";

/// Incrementally delivered answer text. Segments arrive in order and
/// concatenate to the full answer.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Lay out the messages of a request: the system instruction, then the
/// evidence block when there is any, then the conversation.
fn layout(system_instruction: &str, context: &str, turns: &[Message]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(turns.len() + 2);
    messages.push(Message::system(system_instruction));
    if !context.is_empty() {
        messages.push(Message::system(format!("{CONTEXT_PREFIX}{context}")));
    }
    messages.extend(turns.iter().cloned());
    messages
}

/// A chat-mode request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Standing instructions for the assistant.
    pub system_instruction: String,
    /// Assembled evidence; may be empty.
    pub context: String,
    /// Prior turns followed by the new user question.
    pub turns: Vec<Message>,
}

impl ChatRequest {
    /// Create a chat request.
    pub fn new(
        system_instruction: impl Into<String>,
        context: impl Into<String>,
        turns: Vec<Message>,
    ) -> Self {
        Self { system_instruction: system_instruction.into(), context: context.into(), turns }
    }

    /// The ordered message list sent to the generation service.
    pub fn messages(&self) -> Vec<Message> {
        layout(&self.system_instruction, &self.context, &self.turns)
    }
}

/// A study-material request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRequest {
    /// Standing instructions for the content author.
    pub system_instruction: String,
    /// Assembled evidence; may be empty.
    pub context: String,
    /// The task, naming the topic and what to produce.
    pub task: String,
}

impl StudyRequest {
    /// Create a study-material request.
    pub fn new(
        system_instruction: impl Into<String>,
        context: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            context: context.into(),
            task: task.into(),
        }
    }

    /// The ordered message list sent to the generation service.
    pub fn messages(&self) -> Vec<Message> {
        layout(&self.system_instruction, &self.context, &[Message::user(self.task.clone())])
    }
}

/// Sends assembled prompts to a language model.
///
/// Implementations never retry: every failure is returned to the caller.
/// An empty context is a valid request.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Model identifier, for logging.
    fn name(&self) -> &str;

    /// Start a streamed chat answer.
    ///
    /// Cancelling `cancel` ends the stream with [`ModelError::Cancelled`]
    /// and releases the underlying connection.
    ///
    /// [`ModelError::Cancelled`]: crate::ModelError::Cancelled
    async fn stream_chat(&self, request: ChatRequest, cancel: CancellationToken)
    -> Result<TextStream>;

    /// Generate one schema-conformant study-material record with caps applied.
    async fn generate_study_material(&self, request: StudyRequest) -> Result<StudyMaterial>;
}
