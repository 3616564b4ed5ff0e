//! # lingua-runner
//!
//! Query-time flows of the lingua NLP study assistant.
//!
//! - [`ChatSession`] - retrieve, assemble, stream an answer, then record the exchange
//! - [`StudyMaterialGenerator`] - gate the topic, retrieve, assemble, generate one record
//! - [`Evaluator`] - score answers against reference definitions with ROUGE
//!
//! Every flow retrieves the top three passages and degrades to an ungrounded
//! prompt when no index is available.

pub mod chat;
pub mod error;
pub mod eval;
pub mod prompts;
pub mod study;

pub use chat::{ChatAnswer, ChatSession};
pub use error::{Result, RunnerError};
pub use eval::{
    AnswerScore, CaseReport, EvalCase, EvalReport, Evaluator, Rouge, RougeScores, glossary_cases,
};
pub use prompts::{CHAT_SYSTEM_PROMPT, EVAL_SYSTEM_PROMPT, STUDY_SYSTEM_PROMPT, study_task};
pub use study::StudyMaterialGenerator;
