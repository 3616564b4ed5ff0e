//! System instructions and task templates.

/// Standing instruction for chat answers.
pub const CHAT_SYSTEM_PROMPT: &str = "You are an educational AI assistant specializing in NLP. \
Base your responses on the provided context and cite sources when possible.";

/// Standing instruction for evaluation runs, with and without retrieval.
pub const EVAL_SYSTEM_PROMPT: &str = "You are an NLP expert. Answer questions clearly and \
concisely, referencing the uploaded materials when RAG is enabled.";

/// Standing instruction for study-material generation.
pub const STUDY_SYSTEM_PROMPT: &str = "You are an expert educational content creator and \
professor. Create comprehensive, university-level study materials that thoroughly explore the \
topic in depth.";

/// The task sent with a study-material request.
pub fn study_task(topic: &str) -> String {
    format!(
        "Create detailed study materials about {topic}.\n\
         \n\
         Use the context from documents as reference material when it is provided, and cite \
         its sources.\n\
         \n\
         Give the material a title. Write the study guide for a university course in six \
         sections:\n\
         - overview: introduction and historical context\n\
         - core_concepts: fundamentals, key terms and methodologies\n\
         - technical_details: formulas, algorithms and technical depth where applicable\n\
         - practical_applications: real-world examples and case studies\n\
         - challenges: limitations and open problems\n\
         - future_directions: modern developments and trends\n\
         \n\
         Also include 12 flashcards and 4 exercises with detailed solutions."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_names_the_topic_and_quotas() {
        let task = study_task("word embeddings");
        assert!(task.starts_with("Create detailed study materials about word embeddings."));
        assert!(task.contains("12 flashcards and 4 exercises"));
        for section in ["overview", "core_concepts", "future_directions"] {
            assert!(task.contains(section));
        }
    }
}
