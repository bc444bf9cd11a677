//! Multipart upload of archives to the storage service.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{info, warn};

use crate::error::UploadError;

/// Form field name shared by every archive part.
pub const UPLOAD_FIELD: &str = "files";
/// Content type of every archive part.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Result of one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The request never produced a response (connect error, timeout,
    /// unreadable archive).
    NotSent { reason: String },
    /// The server answered with `status`.
    Responded { status: u16 },
}

impl UploadOutcome {
    /// True only for a 2xx response.
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Responded { status } if (200..300).contains(status))
    }

    /// The HTTP status, if a response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadOutcome::Responded { status } => Some(*status),
            UploadOutcome::NotSent { .. } => None,
        }
    }
}

/// Builds `<base>/<destination>/upload`.
///
/// Surrounding slashes on both parts are ignored. The destination may contain
/// nested segments but must not be empty or contain `..`.
pub fn upload_url(base: &str, destination: &str) -> Result<String, UploadError> {
    let destination = destination.trim().trim_matches('/');
    if destination.is_empty() {
        return Err(UploadError::InvalidDestination(
            "destination cannot be empty".to_string(),
        ));
    }
    if destination.split('/').any(|segment| segment == "..") {
        return Err(UploadError::InvalidDestination(format!(
            "destination '{destination}' must not contain '..'"
        )));
    }
    Ok(format!(
        "{}/{}/upload",
        base.trim().trim_end_matches('/'),
        destination
    ))
}

/// Sends archives to the storage service. Single attempt, no retries.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: Client,
}

impl Uploader {
    pub fn new(timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }

    /// Posts every archive in `paths` as one multipart request to `url`.
    ///
    /// Each archive is streamed from disk as a `files` part. The open file
    /// handles belong to the request body and are released when this
    /// returns, whatever the outcome.
    pub async fn upload(&self, paths: &[PathBuf], url: &str) -> UploadOutcome {
        if paths.is_empty() {
            return UploadOutcome::NotSent {
                reason: "no archives to upload".to_string(),
            };
        }

        let form = match build_form(paths).await {
            Ok(form) => form,
            Err(reason) => {
                warn!(url = %url, reason = %reason, "Upload not sent");
                return UploadOutcome::NotSent { reason };
            }
        };

        match self.client.post(url).multipart(form).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if response.status().is_success() {
                    info!(url = %url, status, archives = paths.len(), "Archives uploaded");
                } else {
                    warn!(url = %url, status, "Upload rejected");
                }
                UploadOutcome::Responded { status }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Upload request failed");
                UploadOutcome::NotSent {
                    reason: e.to_string(),
                }
            }
        }
    }
}

async fn build_form(paths: &[PathBuf]) -> Result<Form, String> {
    let mut form = Form::new();
    for path in paths {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| format!("cannot open {}: {e}", path.display()))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| format!("cannot stat {}: {e}", path.display()))?
            .len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let part = Part::stream_with_length(file, len)
            .file_name(file_name)
            .mime_str(ARCHIVE_CONTENT_TYPE)
            .map_err(|e| e.to_string())?;
        form = form.part(UPLOAD_FIELD, part);
    }
    Ok(form)
}
