//! Prompt builder for the code generation call.
//!
//! The user message is the caller's task followed by a fixed addendum that
//! asks the model to lay files out the way the fenced-block grammar expects.

/// Default system role for every provider call.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert software engineer. You write complete, working source code.";

/// Formatting instructions appended to every task.
pub const GENERATION_PROMPT_ADDITION: &str = r#"

Write the complete solution as source files.

Output rules:
1. Put each file in its own fenced code block.
2. Directly above every code block write the file name on its own line, as `### <filename>`.
3. Use plain relative file names such as `main.py` or `src/lib.rs`.
4. Do not leave placeholders; every file must be complete.
5. Keep explanations short and outside the code blocks."#;

/// Prompts for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPrompt {
    /// System role message.
    pub system: String,
    /// User message: the task plus formatting instructions.
    pub user: String,
}

/// Builds the system and user messages for a task.
pub fn build_generation_prompt(system: &str, task: &str) -> GenerationPrompt {
    GenerationPrompt {
        system: system.to_string(),
        user: format!("{}{}", task.trim_end(), GENERATION_PROMPT_ADDITION),
    }
}
