//! paperdrill-providers — LLM quiz-backend integrations.
//!
//! Implements the `QuizBackend` trait for Anthropic and OpenAI,
//! allowing paperdrill to generate and grade quiz questions from
//! multiple LLM backends.

pub mod anthropic;
pub mod config;
pub mod mock;
pub mod openai;
mod parse;

pub use config::{create_backend, load_config, NotionConfig, ProviderConfig, StudyConfig};
pub use paperdrill_core::error::ProviderError;
