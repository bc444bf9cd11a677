//! codegen-forge: multi-model code generation with per-model archives.
//!
//! A task is sent to every configured model. Each free-text answer is parsed
//! into files, the file names are sanitized, every model's files are packed
//! into its own zip archive and the archives are uploaded to a storage
//! service in one multipart request.

// Core modules
pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod sanitize;
pub mod server;
pub mod upload;

// Re-export commonly used types
pub use config::ForgeConfig;
pub use error::{ArchiveError, LlmError, PipelineError, UploadError};
pub use parser::{parse_files, FileRecord, ResponseParser};
pub use pipeline::{GenerationRequest, GenerationResult, GenerationStatus, Orchestrator};
