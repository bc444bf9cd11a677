//! Request handlers.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::errors::ApiError;
use crate::pipeline::{GenerationRequest, GenerationResult, Orchestrator};

/// Multipart field holding the task text file.
pub const FILE_FIELD: &str = "file";
/// Multipart field holding the destination identifier.
pub const STORAGE_PATH_FIELD: &str = "storage_path";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /api/v1/create`: runs the pipeline for an uploaded task file.
pub async fn create(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerationResult>, ApiError> {
    let mut task: Option<Vec<u8>> = None;
    let mut storage_path: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("cannot read file: {e}")))?;
                task = Some(bytes.to_vec());
            }
            Some(STORAGE_PATH_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("cannot read storage_path: {e}")))?;
                storage_path = Some(text);
            }
            _ => {}
        }
    }

    let task = task.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let storage_path = storage_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("storage_path is required"))?;

    let request = GenerationRequest::from_bytes(task, storage_path)?;
    info!(destination = %request.destination(), "Create request accepted");

    match state.orchestrator.run(request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            warn!(error = %e, "Create request failed");
            Err(e.into())
        }
    }
}
