//! LLM provider implementations.
//!
//! Each provider implements [`LlmProvider`] and can serve several models.

pub mod gemini;
pub mod openrouter;

pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;

pub use super::client::LlmProvider;
