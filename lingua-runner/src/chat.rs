//! Retrieval-grounded chat.

use std::sync::Arc;

use futures::StreamExt;
use lingua_model::{ChatHistory, ChatRequest, GenerationGateway, ModelError};
use lingua_rag::{RetrievalResult, Retriever, assemble_context};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, RunnerError};
use crate::prompts::CHAT_SYSTEM_PROMPT;

/// A completed answer.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    /// The full answer text.
    pub text: String,
    /// The passages the answer was grounded on.
    pub retrieval: RetrievalResult,
}

/// One conversation: retrieval, streamed generation and the session history.
///
/// # Example
///
/// ```rust,ignore
/// use lingua_runner::ChatSession;
///
/// let mut session = ChatSession::new(gateway, retriever);
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// tokio::spawn(async move {
///     while let Some(segment) = rx.recv().await {
///         print!("{segment}");
///     }
/// });
/// let answer = session.ask("What is a morpheme?", Some(tx), CancellationToken::new()).await?;
/// ```
pub struct ChatSession {
    gateway: Arc<dyn GenerationGateway>,
    retriever: Retriever,
    system_prompt: String,
    history: ChatHistory,
}

impl ChatSession {
    /// Start an empty session.
    pub fn new(gateway: Arc<dyn GenerationGateway>, retriever: Retriever) -> Self {
        Self {
            gateway,
            retriever,
            system_prompt: CHAT_SYSTEM_PROMPT.to_string(),
            history: ChatHistory::new(),
        }
    }

    /// Replace the standing instruction.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Completed exchanges so far.
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Answer a question.
    ///
    /// Text segments are forwarded to `segments` as they arrive; a dropped
    /// receiver does not stop generation. The question and answer are added
    /// to the history only after the stream completes, so a failed or
    /// cancelled answer leaves the history unchanged.
    ///
    /// # Errors
    ///
    /// [`RunnerError::EmptyInput`] for a blank question, otherwise
    /// [`RunnerError::Generation`] when the generation service fails, the
    /// answer is empty, or `cancel` fires.
    pub async fn ask(
        &mut self,
        question: &str,
        segments: Option<UnboundedSender<String>>,
        cancel: CancellationToken,
    ) -> Result<ChatAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RunnerError::EmptyInput);
        }

        let retrieval = self.retriever.retrieve(question).await;
        let context = assemble_context(retrieval.passages());
        debug!(status = ?retrieval.status, context_len = context.len(), "assembled context");

        let request =
            ChatRequest::new(&self.system_prompt, context, self.history.with_question(question));
        let mut stream = self.gateway.stream_chat(request, cancel.clone()).await?;

        let mut text = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ModelError::Cancelled),
                next = stream.next() => Ok(next),
            }?;
            let Some(segment) = next else { break };
            let segment = segment?;

            text.push_str(&segment);
            if let Some(sink) = &segments {
                let _ = sink.send(segment);
            }
        }

        if text.trim().is_empty() {
            warn!(model = %self.gateway.name(), "generation returned an empty answer");
            return Err(ModelError::Stream("generation produced no text".into()).into());
        }

        self.history.push_exchange(question, text.clone());
        info!(
            model = %self.gateway.name(),
            grounded_on = retrieval.passages.len(),
            answer_len = text.len(),
            turns = self.history.len(),
            "answered question"
        );
        Ok(ChatAnswer { text, retrieval })
    }
}
