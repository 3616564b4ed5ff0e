//! Scripted gateway for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_stream::try_stream;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{ModelError, Result};
use crate::gateway::{ChatRequest, GenerationGateway, StudyRequest, TextStream};
use crate::study::StudyMaterial;

/// One scripted chat reply.
#[derive(Debug, Clone)]
pub enum ChatScript {
    /// Stream these segments, then end.
    Segments(Vec<String>),
    /// Stream these segments, then fail with a stream error.
    FailAfter(Vec<String>, String),
    /// Refuse the request before streaming.
    Reject(String),
}

/// A [`GenerationGateway`] that replays scripted responses and records the
/// requests it receives.
///
/// Chat scripts and study responses are consumed in order; when a queue is
/// empty, chat replies with `"ok"` and study generation fails.
///
/// # Example
///
/// ```rust,ignore
/// use lingua_model::MockGateway;
///
/// let gateway = MockGateway::new().with_chat_segments(["Syntax ", "is ", "structure."]);
/// ```
#[derive(Debug, Default)]
pub struct MockGateway {
    chat: Mutex<VecDeque<ChatScript>>,
    study: Mutex<VecDeque<String>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    study_requests: Mutex<Vec<StudyRequest>>,
}

impl MockGateway {
    /// A gateway with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chat reply streamed as the given segments.
    pub fn with_chat_segments<I, S>(self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_chat_script(ChatScript::Segments(segments.into_iter().map(Into::into).collect()))
    }

    /// Queue an arbitrary chat script.
    pub fn with_chat_script(self, script: ChatScript) -> Self {
        lock(&self.chat).push_back(script);
        self
    }

    /// Queue a raw structured response, parsed like a real one.
    pub fn with_study_response(self, raw: impl Into<String>) -> Self {
        lock(&self.study).push_back(raw.into());
        self
    }

    /// Chat requests received so far.
    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        lock(&self.chat_requests).clone()
    }

    /// Study requests received so far.
    pub fn study_requests(&self) -> Vec<StudyRequest> {
        lock(&self.study_requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl GenerationGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<TextStream> {
        lock(&self.chat_requests).push(request);
        let script =
            lock(&self.chat).pop_front().unwrap_or_else(|| ChatScript::Segments(vec!["ok".into()]));

        let (segments, failure) = match script {
            ChatScript::Segments(segments) => (segments, None),
            ChatScript::FailAfter(segments, message) => (segments, Some(message)),
            ChatScript::Reject(message) => {
                return Err(ModelError::Api { status: 400, message });
            }
        };

        let stream = try_stream! {
            for segment in segments {
                tokio::task::yield_now().await;
                if cancel.is_cancelled() {
                    Err(ModelError::Cancelled)?;
                }
                yield segment;
            }
            if let Some(message) = failure {
                Err(ModelError::Stream(message))?;
            }
        };
        Ok(Box::pin(stream))
    }

    async fn generate_study_material(&self, request: StudyRequest) -> Result<StudyMaterial> {
        lock(&self.study_requests).push(request);
        let raw = lock(&self.study)
            .pop_front()
            .ok_or_else(|| ModelError::Api { status: 503, message: "no scripted response".into() })?;
        StudyMaterial::from_json(&raw)
    }
}
