//! HTTP client for the external speech-to-text and language-model API.
//!
//! Speaks an OpenAI-compatible surface: Whisper-style transcription and
//! translation endpoints plus chat completions for content generation.
//! The worker is the only consumer.

pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{MlClient, MlClientConfig};
pub use error::{MlError, MlResult};
