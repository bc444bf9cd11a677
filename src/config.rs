//! Service configuration.
//!
//! All environment-sourced settings (API keys, base URLs, model tables,
//! staging and upload locations) are read once into a [`ForgeConfig`] and then
//! handed to the components that need them.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::llm::providers::gemini::GEMINI_BASE_URL;
use crate::llm::providers::openrouter::OPENROUTER_BASE_URL;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// One model exposed by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    /// Identifier used in results and archive names (e.g. "deepseek").
    pub name: String,
    /// Provider-side model id (e.g. "deepseek/deepseek-chat").
    pub id: String,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Settings for one provider section.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    pub models: Vec<ModelSpec>,
}

/// Configuration for the generation service.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    // Providers
    /// OpenRouter section; `None` when no API key is configured.
    pub openrouter: Option<ProviderSettings>,
    /// Gemini section; `None` when no API key is configured.
    pub gemini: Option<ProviderSettings>,
    /// System role prompt sent with every task.
    pub system_prompt: String,
    /// Timeout for a single provider call.
    pub request_timeout: Duration,
    /// Maximum provider calls in flight for one request.
    pub max_concurrent_calls: usize,
    /// Sampling temperature; provider default when unset.
    pub temperature: Option<f64>,
    /// Completion length cap; provider default when unset.
    pub max_tokens: Option<u32>,

    // Storage and upload
    /// Root directory under which per-request staging directories are created.
    pub staging_dir: PathBuf,
    /// Base URL; uploads go to `<base>/<destination>/upload`.
    pub upload_base_url: String,
    /// Timeout for the upload request.
    pub upload_timeout: Duration,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            openrouter: None,
            gemini: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout: Duration::from_secs(120),
            max_concurrent_calls: 4,
            temperature: None,
            max_tokens: None,
            staging_dir: PathBuf::from("./files"),
            upload_base_url: "http://localhost:8080/api".to_string(),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

/// Built-in OpenRouter model table.
pub fn default_openrouter_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("deepseek", "deepseek/deepseek-chat"),
        ModelSpec::new("qwen-coder", "qwen/qwen-2.5-coder-32b-instruct"),
        ModelSpec::new("llama", "meta-llama/llama-3.3-70b-instruct"),
    ]
}

/// Built-in Gemini model table.
pub fn default_gemini_models() -> Vec<ModelSpec> {
    vec![ModelSpec::new("gemini-flash", "gemini-2.5-flash")]
}

impl ForgeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENROUTER_API_KEY`: enables the OpenRouter provider
    /// - `OPENROUTER_API_URL`: OpenRouter base URL
    /// - `FORGE_OPENROUTER_MODELS`: `name=id` pairs, comma separated
    /// - `GEMINI_API_KEY`: enables the Gemini provider
    /// - `GEMINI_API_URL`: Gemini base URL
    /// - `FORGE_GEMINI_MODELS`: `name=id` pairs, comma separated
    /// - `FORGE_SYSTEM_PROMPT`: system role text
    /// - `FORGE_REQUEST_TIMEOUT_SECS`: provider call timeout (default: 120)
    /// - `FORGE_MAX_CONCURRENT_CALLS`: concurrent provider calls (default: 4)
    /// - `FORGE_TEMPERATURE`: sampling temperature, 0.0 - 2.0 (default: unset)
    /// - `FORGE_MAX_TOKENS`: completion length cap (default: unset)
    /// - `FORGE_STAGING_DIR`: staging root (default: ./files)
    /// - `FORGE_UPLOAD_BASE_URL`: upload base (default: http://localhost:8080/api)
    /// - `FORGE_UPLOAD_TIMEOUT_SECS`: upload timeout (default: 300)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value or the
    /// resulting configuration does not validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(api_key) = non_empty_env("OPENROUTER_API_KEY") {
            let base_url = non_empty_env("OPENROUTER_API_URL")
                .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string());
            let models = match non_empty_env("FORGE_OPENROUTER_MODELS") {
                Some(val) => parse_model_table(&val, "FORGE_OPENROUTER_MODELS")?,
                None => default_openrouter_models(),
            };
            config.openrouter = Some(ProviderSettings {
                api_key,
                base_url,
                models,
            });
        }

        if let Some(api_key) = non_empty_env("GEMINI_API_KEY") {
            let base_url =
                non_empty_env("GEMINI_API_URL").unwrap_or_else(|| GEMINI_BASE_URL.to_string());
            let models = match non_empty_env("FORGE_GEMINI_MODELS") {
                Some(val) => parse_model_table(&val, "FORGE_GEMINI_MODELS")?,
                None => default_gemini_models(),
            };
            config.gemini = Some(ProviderSettings {
                api_key,
                base_url,
                models,
            });
        }

        if let Some(val) = non_empty_env("FORGE_SYSTEM_PROMPT") {
            config.system_prompt = val;
        }

        if let Some(val) = non_empty_env("FORGE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "FORGE_REQUEST_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = non_empty_env("FORGE_MAX_CONCURRENT_CALLS") {
            config.max_concurrent_calls = parse_env_value(&val, "FORGE_MAX_CONCURRENT_CALLS")?;
        }

        if let Some(val) = non_empty_env("FORGE_TEMPERATURE") {
            config.temperature = Some(parse_env_value(&val, "FORGE_TEMPERATURE")?);
        }

        if let Some(val) = non_empty_env("FORGE_MAX_TOKENS") {
            config.max_tokens = Some(parse_env_value(&val, "FORGE_MAX_TOKENS")?);
        }

        if let Some(val) = non_empty_env("FORGE_STAGING_DIR") {
            config.staging_dir = PathBuf::from(val);
        }

        if let Some(val) = non_empty_env("FORGE_UPLOAD_BASE_URL") {
            config.upload_base_url = val;
        }

        if let Some(val) = non_empty_env("FORGE_UPLOAD_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "FORGE_UPLOAD_TIMEOUT_SECS")?;
            config.upload_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_calls == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_concurrent_calls must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::ValidationFailed(format!(
                    "temperature must be between 0.0 and 2.0, got {temperature}"
                )));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.upload_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "upload_timeout must be greater than 0".to_string(),
            ));
        }

        if self.upload_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "upload_base_url cannot be empty".to_string(),
            ));
        }

        if self.staging_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "staging_dir cannot be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for model in self.models() {
            if model.name.trim().is_empty() || model.id.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "model name and id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(model.name.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "model name '{}' is configured more than once",
                    model.name
                )));
            }
        }

        Ok(())
    }

    /// All configured models across providers, in roster order.
    pub fn models(&self) -> impl Iterator<Item = &ModelSpec> {
        self.openrouter
            .iter()
            .chain(self.gemini.iter())
            .flat_map(|p| p.models.iter())
    }

    /// Builder method to configure OpenRouter.
    pub fn with_openrouter(mut self, api_key: impl Into<String>, models: Vec<ModelSpec>) -> Self {
        self.openrouter = Some(ProviderSettings {
            api_key: api_key.into(),
            base_url: OPENROUTER_BASE_URL.to_string(),
            models,
        });
        self
    }

    /// Builder method to configure Gemini.
    pub fn with_gemini(mut self, api_key: impl Into<String>, models: Vec<ModelSpec>) -> Self {
        self.gemini = Some(ProviderSettings {
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            models,
        });
        self
    }

    /// Builder method to set the staging root.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Builder method to set the upload base URL.
    pub fn with_upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.upload_base_url = url.into();
        self
    }

    /// Builder method to set the upload timeout.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Builder method to set the provider call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builder method to set the provider call concurrency.
    pub fn with_max_concurrent_calls(mut self, max: usize) -> Self {
        self.max_concurrent_calls = max;
        self
    }

    /// Builder method to set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Builder method to cap completion length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Builder method to set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an environment variable value into the specified type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Parses a `name=id,name=id` model table.
///
/// A bare entry without `=` uses the id as the name.
pub fn parse_model_table(value: &str, key: &str) -> Result<Vec<ModelSpec>, ConfigError> {
    let mut models = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let spec = match entry.split_once('=') {
            Some((name, id)) => ModelSpec::new(name.trim(), id.trim()),
            None => ModelSpec::new(entry, entry),
        };
        if spec.name.is_empty() || spec.id.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("malformed model entry '{}'", entry),
            });
        }
        models.push(spec);
    }
    if models.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "no models listed".to_string(),
        });
    }
    Ok(models)
}
