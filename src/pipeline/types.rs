//! Values passed through one generation request.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// A validated task and the storage destination for its archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    task: String,
    destination: String,
}

impl GenerationRequest {
    /// Validates and builds a request.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the task or the destination
    /// is empty or whitespace.
    pub fn new(
        task: impl Into<String>,
        destination: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let task = task.into();
        let destination = destination.into();

        if task.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "task text cannot be empty".to_string(),
            ));
        }
        if destination.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "destination cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            task,
            destination: destination.trim().to_string(),
        })
    }

    /// Builds a request from raw task bytes, which must be valid UTF-8.
    pub fn from_bytes(task: Vec<u8>, destination: impl Into<String>) -> Result<Self, PipelineError> {
        let task = String::from_utf8(task).map_err(|_| {
            PipelineError::InvalidInput("task text must be valid UTF-8".to_string())
        })?;
        Self::new(task, destination)
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// Raw answer of one model. Empty when the call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    /// Model name from the roster.
    pub model: String,
    /// Provider that served the call.
    pub provider: String,
    pub content: String,
    /// Why the call produced nothing, if it failed.
    pub error: Option<String>,
}

impl ModelResponse {
    pub fn new(
        model: impl Into<String>,
        provider: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            provider: provider.into(),
            content: content.into(),
            error: None,
        }
    }

    /// A failed call; contributes no files.
    pub fn failed(
        model: impl Into<String>,
        provider: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            provider: provider.into(),
            content: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Overall status of a request that produced archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Success,
    UploadFailed,
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStatus::Success => write!(f, "success"),
            GenerationStatus::UploadFailed => write!(f, "upload_failed"),
        }
    }
}

/// Result returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub status: GenerationStatus,
    /// Destination identifier from the request.
    #[serde(rename = "storagePath")]
    pub storage_path: String,
    pub upload_url: String,
    pub upload_success: bool,
    /// HTTP status of the upload, `null` when no response arrived.
    pub upload_status: Option<u16>,
    /// Archive paths, in roster order.
    pub generated_archives: Vec<PathBuf>,
    pub request_id: Uuid,
    /// When the pipeline finished.
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        let request = GenerationRequest::new("reverse a string", "  proj  ").expect("valid");
        assert_eq!(request.task(), "reverse a string");
        assert_eq!(request.destination(), "proj");

        assert!(GenerationRequest::new("", "proj")
            .expect_err("empty task")
            .is_client_error());
        assert!(GenerationRequest::new(" \n", "proj").is_err());
        assert!(GenerationRequest::new("task", "").is_err());
    }

    #[test]
    fn test_request_from_bytes_rejects_invalid_utf8() {
        let err = GenerationRequest::from_bytes(vec![0xff, 0xfe], "proj").expect_err("invalid");
        assert!(err.to_string().contains("UTF-8"));
        assert!(GenerationRequest::from_bytes(b"ok".to_vec(), "proj").is_ok());
    }

    #[test]
    fn test_result_serialization() {
        let result = GenerationResult {
            status: GenerationStatus::UploadFailed,
            storage_path: "proj".to_string(),
            upload_url: "http://h/api/proj/upload".to_string(),
            upload_success: false,
            upload_status: None,
            generated_archives: vec![PathBuf::from("files/r/modela.zip")],
            request_id: Uuid::nil(),
            completed_at: Utc::now(),
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["status"], "upload_failed");
        assert_eq!(json["storagePath"], "proj");
        assert!(json["upload_status"].is_null());
        assert_eq!(json["generated_archives"][0], "files/r/modela.zip");
    }
}
