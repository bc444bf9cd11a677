//! LLM prompts for code generation.

pub mod generation;

pub use generation::{
    build_generation_prompt, GenerationPrompt, DEFAULT_SYSTEM_PROMPT, GENERATION_PROMPT_ADDITION,
};
