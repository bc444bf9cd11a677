//! Error types for codegen-forge operations.
//!
//! Defines error types for the major subsystems:
//! - LLM provider calls
//! - Archive writing
//! - Archive upload
//! - Pipeline orchestration

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP client could not be built: {0}")]
    ClientBuild(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while writing a model archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Model '{0}' has no file records to archive")]
    EmptyModel(String),

    #[error("Failed to write zip entry '{entry}' in {path}: {source}")]
    Zip {
        path: PathBuf,
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to persist archive {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive worker panicked: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while setting up an upload.
///
/// Transport failures during the upload itself are not errors; they are
/// reported as an [`UploadOutcome`](crate::upload::UploadOutcome).
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP client could not be built: {0}")]
    ClientBuild(String),

    #[error("Invalid upload destination: {0}")]
    InvalidDestination(String),
}

/// Terminal failures of one generation request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No archives were generated")]
    NoArchives,

    #[error("Failed to prepare staging directory {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Generation failed: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether the failure was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidInput(_))
    }
}
