//! Pipeline orchestrator.
//!
//! Runs one request end to end: ask every model in the roster, parse each
//! response into files, write one archive per model into a request-scoped
//! staging directory, upload the archives and report the outcome.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::archive::Archiver;
use crate::config::ForgeConfig;
use crate::error::PipelineError;
use crate::llm::{CompletionRequest, Message, ModelRoster};
use crate::parser::{FileRecord, ResponseParser};
use crate::prompts::build_generation_prompt;
use crate::upload::{upload_url, Uploader};

use super::types::{GenerationRequest, GenerationResult, GenerationStatus, ModelResponse};

/// Coordinates generation, parsing, archiving and upload.
pub struct Orchestrator {
    roster: ModelRoster,
    parser: ResponseParser,
    uploader: Uploader,
    config: ForgeConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("roster", &self.roster)
            .field("parser", &self.parser)
            .field("staging_dir", &self.config.staging_dir)
            .finish()
    }
}

impl Orchestrator {
    /// Creates an orchestrator for an explicit roster.
    pub fn new(config: ForgeConfig, roster: ModelRoster) -> Result<Self, PipelineError> {
        let uploader = Uploader::new(config.upload_timeout)
            .map_err(|e| PipelineError::Internal(e.to_string()))?;
        Ok(Self {
            roster,
            parser: ResponseParser::default(),
            uploader,
            config,
        })
    }

    /// Creates an orchestrator whose roster comes from `config`.
    pub fn from_config(config: ForgeConfig) -> Result<Self, PipelineError> {
        let roster =
            ModelRoster::from_config(&config).map_err(|e| PipelineError::Internal(e.to_string()))?;
        Self::new(config, roster)
    }

    /// Replaces the response parser.
    pub fn with_parser(mut self, parser: ResponseParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn roster(&self) -> &ModelRoster {
        &self.roster
    }

    /// Runs the whole pipeline for one request.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidInput`] for a destination that cannot form an
    ///   upload URL; no provider is called.
    /// - [`PipelineError::NoArchives`] when no model produced any file.
    /// - [`PipelineError::Staging`] when the staging directory cannot be created.
    ///
    /// A failed upload is not an error; it is reported in the result.
    #[instrument(skip(self, request), fields(destination = %request.destination()))]
    pub async fn run(&self, request: GenerationRequest) -> Result<GenerationResult, PipelineError> {
        let url = upload_url(&self.config.upload_base_url, request.destination())
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        if self.roster.is_empty() {
            return Err(PipelineError::Internal(
                "no LLM providers are configured".to_string(),
            ));
        }

        let request_id = Uuid::new_v4();
        let staging = self.config.staging_dir.join(request_id.to_string());
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|source| PipelineError::Staging {
                path: staging.clone(),
                source,
            })?;

        info!(
            request_id = %request_id,
            models = self.roster.model_count(),
            staging = %staging.display(),
            "Starting generation"
        );

        let responses = self.collect_responses(request.task()).await;
        let outputs = self.parse_responses(responses);

        let archives = Archiver::new(&staging)
            .write_archives(outputs)
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))?;

        if archives.is_empty() {
            warn!(request_id = %request_id, "No model produced any files");
            // Nothing was written; drop the empty request directory.
            let _ = tokio::fs::remove_dir(&staging).await;
            return Err(PipelineError::NoArchives);
        }

        let paths: Vec<PathBuf> = archives.into_iter().map(|a| a.path).collect();
        let outcome = self.uploader.upload(&paths, &url).await;
        let upload_success = outcome.is_success();

        let status = if upload_success {
            GenerationStatus::Success
        } else {
            GenerationStatus::UploadFailed
        };
        info!(
            request_id = %request_id,
            archives = paths.len(),
            status = %status,
            upload_status = ?outcome.status(),
            "Generation finished"
        );

        Ok(GenerationResult {
            status,
            storage_path: request.destination().to_string(),
            upload_url: url,
            upload_success,
            upload_status: outcome.status(),
            generated_archives: paths,
            request_id,
            completed_at: Utc::now(),
        })
    }

    /// Asks every model in the roster for a solution to `task`.
    ///
    /// Calls run concurrently, at most `max_concurrent_calls` at a time. A
    /// failed call yields an empty response for that model. Responses come
    /// back in roster order.
    pub async fn collect_responses(&self, task: &str) -> Vec<ModelResponse> {
        let prompt = build_generation_prompt(&self.config.system_prompt, task);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_calls.max(1)));

        let futures: Vec<_> = self
            .roster
            .assignments()
            .map(|(provider, model)| {
                let semaphore = semaphore.clone();
                let mut request = CompletionRequest::new(
                    model.id.clone(),
                    vec![
                        Message::system(prompt.system.clone()),
                        Message::user(prompt.user.clone()),
                    ],
                );
                if let Some(temperature) = self.config.temperature {
                    request = request.with_temperature(temperature);
                }
                if let Some(max_tokens) = self.config.max_tokens {
                    request = request.with_max_tokens(max_tokens);
                }
                async move {
                    let _permit = semaphore.acquire().await.ok();
                    match provider.generate(request).await {
                        Ok(response) => {
                            let content = response.first_content().unwrap_or_default();
                            debug!(
                                model = %model.name,
                                provider = provider.name(),
                                chars = content.len(),
                                "Model responded"
                            );
                            ModelResponse::new(&model.name, provider.name(), content)
                        }
                        Err(e) => {
                            warn!(
                                model = %model.name,
                                provider = provider.name(),
                                error = %e,
                                "Model call failed, continuing without it"
                            );
                            ModelResponse::failed(&model.name, provider.name(), e.to_string())
                        }
                    }
                }
            })
            .collect();

        futures::future::join_all(futures).await
    }

    fn parse_responses(&self, responses: Vec<ModelResponse>) -> Vec<(String, Vec<FileRecord>)> {
        responses
            .into_iter()
            .map(|response| {
                let records = self.parser.parse(&response.content);
                debug!(model = %response.model, files = records.len(), "Parsed response");
                (response.model, records)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::config::ModelSpec;
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, LlmProvider};

    /// Answers each model id with a fixed response; unknown ids fail.
    struct MockLlmProvider {
        responses: Vec<(String, String)>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmProvider {
        fn new(responses: &[(&str, &str)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(m, r)| (m.to_string(), r.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().expect("lock poisoned").push(request.clone());
            self.responses
                .iter()
                .find(|(model, _)| *model == request.model)
                .map(|(model, content)| CompletionResponse::single(model.clone(), content.clone()))
                .ok_or_else(|| LlmError::ApiError {
                    code: 503,
                    message: "unavailable".to_string(),
                })
        }
    }

    /// Tracks how many calls are in flight at once.
    struct SlowProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(CompletionResponse::single(request.model, ""))
        }
    }

    const REVERSE_RESPONSE: &str =
        "Here you go.\n\n### reverse.py\n```python\ndef reverse(s): return s[::-1]\n```\n";

    fn config(staging: &TempDir) -> ForgeConfig {
        ForgeConfig::default()
            .with_staging_dir(staging.path())
            .with_upload_base_url("http://127.0.0.1:1/api")
            .with_upload_timeout(Duration::from_secs(5))
    }

    fn roster(provider: Arc<dyn LlmProvider>, names: &[&str]) -> ModelRoster {
        ModelRoster::new().with_provider(
            provider,
            names.iter().map(|n| ModelSpec::new(*n, *n)).collect(),
        )
    }

    #[tokio::test]
    async fn test_run_archives_models_with_files() {
        let staging = TempDir::new().expect("tempdir");
        let provider = Arc::new(MockLlmProvider::new(&[
            ("modelA", REVERSE_RESPONSE),
            ("modelB", ""),
        ]));
        let orchestrator =
            Orchestrator::new(config(&staging), roster(provider.clone(), &["modelA", "modelB"]))
                .expect("orchestrator");

        let request = GenerationRequest::new("Write a string reverse function", "proj")
            .expect("request");
        let result = orchestrator.run(request).await.expect("run");

        assert_eq!(result.generated_archives.len(), 1);
        let archive = &result.generated_archives[0];
        assert_eq!(archive.file_name().and_then(|n| n.to_str()), Some("modela.zip"));
        assert_eq!(
            archive.parent(),
            Some(staging.path().join(result.request_id.to_string()).as_path())
        );

        assert_eq!(result.status, GenerationStatus::UploadFailed);
        assert!(!result.upload_success);
        assert_eq!(result.upload_status, None);
        assert_eq!(result.storage_path, "proj");
        assert_eq!(result.upload_url, "http://127.0.0.1:1/api/proj/upload");

        let requests = provider.requests.lock().expect("lock").clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].system_prompt(),
            Some(crate::prompts::DEFAULT_SYSTEM_PROMPT)
        );
        assert!(requests[0].messages[1]
            .content
            .starts_with("Write a string reverse function"));
    }

    #[tokio::test]
    async fn test_sampling_settings_reach_every_request() {
        let staging = TempDir::new().expect("tempdir");
        let provider = Arc::new(MockLlmProvider::new(&[("modelA", REVERSE_RESPONSE)]));
        let orchestrator = Orchestrator::new(
            config(&staging).with_temperature(0.2).with_max_tokens(2048),
            roster(provider.clone(), &["modelA", "modelB"]),
        )
        .expect("orchestrator");

        orchestrator.collect_responses("task").await;

        let requests = provider.requests.lock().expect("lock").clone();
        assert_eq!(requests.len(), 2);
        for request in requests {
            assert_eq!(request.temperature, Some(0.2));
            assert_eq!(request.max_tokens, Some(2048));
        }
    }

    #[tokio::test]
    async fn test_failed_provider_contributes_nothing() {
        let staging = TempDir::new().expect("tempdir");
        let provider = Arc::new(MockLlmProvider::new(&[("good", REVERSE_RESPONSE)]));
        let orchestrator =
            Orchestrator::new(config(&staging), roster(provider, &["broken", "good"]))
                .expect("orchestrator");

        let responses = orchestrator.collect_responses("task").await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].model, "broken");
        assert!(responses[0].content.is_empty());
        assert!(responses[0].error.is_some());
        assert_eq!(responses[1].model, "good");
        assert!(responses[1].error.is_none());
    }

    #[tokio::test]
    async fn test_no_files_is_terminal() {
        let staging = TempDir::new().expect("tempdir");
        let provider = Arc::new(MockLlmProvider::new(&[
            ("a", ""),
            ("b", "I cannot write code today."),
        ]));
        let orchestrator = Orchestrator::new(config(&staging), roster(provider, &["a", "b"]))
            .expect("orchestrator");

        let err = orchestrator
            .run(GenerationRequest::new("task", "proj").expect("request"))
            .await
            .expect_err("no archives");

        assert!(matches!(err, PipelineError::NoArchives));
        assert_eq!(
            std::fs::read_dir(staging.path()).expect("read dir").count(),
            0,
            "empty request directory is removed"
        );
    }

    #[tokio::test]
    async fn test_invalid_destination_skips_providers() {
        let staging = TempDir::new().expect("tempdir");
        let provider = Arc::new(MockLlmProvider::new(&[("a", REVERSE_RESPONSE)]));
        let orchestrator = Orchestrator::new(config(&staging), roster(provider.clone(), &["a"]))
            .expect("orchestrator");

        let err = orchestrator
            .run(GenerationRequest::new("task", "../secrets").expect("request"))
            .await
            .expect_err("invalid destination");

        assert!(err.is_client_error());
        assert!(provider.requests.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_empty_roster_fails() {
        let staging = TempDir::new().expect("tempdir");
        let orchestrator =
            Orchestrator::new(config(&staging), ModelRoster::new()).expect("orchestrator");

        let err = orchestrator
            .run(GenerationRequest::new("task", "proj").expect("request"))
            .await
            .expect_err("no providers");
        assert!(matches!(err, PipelineError::Internal(_)));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let staging = TempDir::new().expect("tempdir");
        let provider = Arc::new(SlowProvider {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let orchestrator = Orchestrator::new(
            config(&staging).with_max_concurrent_calls(2),
            roster(provider.clone(), &["a", "b", "c", "d", "e"]),
        )
        .expect("orchestrator");

        let responses = orchestrator.collect_responses("task").await;

        assert_eq!(responses.len(), 5);
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_requests_use_separate_staging_dirs() {
        let staging = TempDir::new().expect("tempdir");
        let provider = Arc::new(MockLlmProvider::new(&[("modelA", REVERSE_RESPONSE)]));
        let orchestrator = Orchestrator::new(config(&staging), roster(provider, &["modelA"]))
            .expect("orchestrator");

        let first = orchestrator
            .run(GenerationRequest::new("task", "proj").expect("request"))
            .await
            .expect("run");
        let second = orchestrator
            .run(GenerationRequest::new("task", "proj").expect("request"))
            .await
            .expect("run");

        assert_ne!(first.request_id, second.request_id);
        assert_ne!(first.generated_archives, second.generated_archives);
        assert!(first.generated_archives[0].exists());
        assert!(second.generated_archives[0].exists());
    }
}
