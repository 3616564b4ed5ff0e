//! Study-material generation for a topic.

use std::sync::Arc;

use lingua_model::{GenerationGateway, StudyMaterial, StudyRequest};
use lingua_rag::{RelevanceFilter, Retriever, assemble_context};
use tracing::{debug, info, warn};

use crate::error::{Result, RunnerError};
use crate::prompts::{STUDY_SYSTEM_PROMPT, study_task};

/// Produces one [`StudyMaterial`] per call, grounded on retrieved passages.
///
/// Topics are gated by the same keyword set that admits documents, matched
/// as whole words, so off-domain topics are refused before any service call.
pub struct StudyMaterialGenerator {
    gateway: Arc<dyn GenerationGateway>,
    retriever: Retriever,
    filter: Arc<RelevanceFilter>,
}

impl StudyMaterialGenerator {
    /// Create a generator using the canonical keyword set.
    pub fn new(gateway: Arc<dyn GenerationGateway>, retriever: Retriever) -> Self {
        Self { gateway, retriever, filter: Arc::new(RelevanceFilter::default()) }
    }

    /// Use a specific relevance filter for topic gating.
    pub fn with_filter(mut self, filter: Arc<RelevanceFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Generate study material for `topic`.
    ///
    /// The record is returned whole or not at all. Flashcard and exercise
    /// caps are re-applied here whatever the gateway returned.
    ///
    /// # Errors
    ///
    /// [`RunnerError::EmptyInput`] for a blank topic, [`RunnerError::OffTopic`]
    /// when the topic names no domain term, and [`RunnerError::Generation`]
    /// when the service fails or its response violates the schema.
    pub async fn generate(&self, topic: &str) -> Result<StudyMaterial> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(RunnerError::EmptyInput);
        }
        if !self.filter.matches_topic(topic) {
            warn!(topic = %topic, "topic rejected: not about NLP or linguistics");
            return Err(RunnerError::OffTopic { topic: topic.to_string() });
        }

        let retrieval = self.retriever.retrieve(topic).await;
        let context = assemble_context(retrieval.passages());
        debug!(status = ?retrieval.status, context_len = context.len(), "assembled context");

        let request = StudyRequest::new(STUDY_SYSTEM_PROMPT, context, study_task(topic));
        let material = self.gateway.generate_study_material(request).await?.enforce_caps();

        info!(
            topic = %topic,
            model = %self.gateway.name(),
            grounded_on = retrieval.passages.len(),
            flashcards = material.flashcards.len(),
            exercises = material.exercises.len(),
            "generated study material"
        );
        Ok(material)
    }
}
