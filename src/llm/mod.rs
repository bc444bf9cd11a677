//! LLM integration for codegen-forge.
//!
//! This module provides the provider-neutral completion types, the
//! [`LlmProvider`] trait, concrete providers (OpenRouter, Gemini) and the
//! [`ModelRoster`] that lists which models a task is sent to.
//!
//! ```ignore
//! use codegen_forge::config::{ForgeConfig, ModelSpec};
//! use codegen_forge::llm::ModelRoster;
//!
//! let config = ForgeConfig::default()
//!     .with_openrouter("sk-...", vec![ModelSpec::new("deepseek", "deepseek/deepseek-chat")]);
//! let roster = ModelRoster::from_config(&config)?;
//! assert_eq!(roster.model_count(), 1);
//! ```

pub mod client;
pub mod providers;
pub mod roster;

pub use client::{Choice, CompletionRequest, CompletionResponse, LlmProvider, Message, Usage};
pub use providers::{GeminiProvider, OpenRouterProvider};
pub use roster::{ModelRoster, RosterEntry};
