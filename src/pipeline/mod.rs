//! Generation pipeline.
//!
//! - **Types**: the validated request, per-model responses and the result
//!   returned to the caller
//! - **Orchestrator**: runs generate → parse → sanitize → archive → upload
//!
//! # Example
//!
//! ```rust,ignore
//! use codegen_forge::config::ForgeConfig;
//! use codegen_forge::pipeline::{GenerationRequest, Orchestrator};
//!
//! let orchestrator = Orchestrator::from_config(ForgeConfig::from_env()?)?;
//! let request = GenerationRequest::new("Write a string reverse function", "my-project")?;
//! let result = orchestrator.run(request).await?;
//!
//! println!("{}: {} archive(s)", result.status, result.generated_archives.len());
//! ```

pub mod orchestrator;
pub mod types;

pub use orchestrator::Orchestrator;
pub use types::{GenerationRequest, GenerationResult, GenerationStatus, ModelResponse};
