//! # lingua-model
//!
//! Generation gateway for the lingua NLP study assistant.
//!
//! ## Overview
//!
//! This crate defines how assembled prompts reach a language model:
//!
//! - [`GenerationGateway`] - the contract: streamed chat answers and structured study material
//! - [`OpenAIClient`] - OpenAI and OpenAI-compatible APIs (vLLM, Ollama, ...)
//! - [`MockGateway`] - scripted responses for tests
//!
//! plus the records that flow through it: [`Message`] and [`ChatHistory`] for
//! chat mode, [`StudyMaterial`] with its JSON schema for study-material mode,
//! and the flashcard exports in [`export`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use lingua_model::{ChatRequest, GenerationGateway, Message, OpenAIClient, OpenAIConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = OpenAIClient::new(OpenAIConfig::new(
//!     std::env::var("OPENAI_API_KEY")?,
//!     "gpt-4o",
//! ))?;
//!
//! let request = ChatRequest::new("You are an NLP tutor.", "", vec![Message::user("What is a morpheme?")]);
//! let mut stream = client.stream_chat(request, CancellationToken::new()).await?;
//! while let Some(segment) = stream.next().await {
//!     print!("{}", segment?);
//! }
//! ```
//!
//! ## Features
//!
//! - `openai` (default) - the HTTP client

pub mod error;
pub mod export;
pub mod gateway;
pub mod message;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod study;

pub use error::{ModelError, Result};
pub use gateway::{CONTEXT_PREFIX, ChatRequest, GenerationGateway, StudyRequest, TextStream};
pub use message::{ChatHistory, Message, Role};
pub use mock::{ChatScript, MockGateway};
#[cfg(feature = "openai")]
pub use openai::{OpenAIClient, OpenAIConfig};
pub use study::{Exercise, Flashcard, MAX_EXERCISES, MAX_FLASHCARDS, StudyGuide, StudyMaterial};
