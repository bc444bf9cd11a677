//! The set of providers and models consulted for every task.
//!
//! A [`ModelRoster`] is an ordered list of `(provider, models)` entries. The
//! orchestrator fans a task out to every model in the roster.

use std::sync::Arc;

use tracing::info;

use super::providers::{GeminiProvider, OpenRouterProvider};
use super::LlmProvider;
use crate::config::{ForgeConfig, ModelSpec};
use crate::error::LlmError;

/// One provider together with the models it serves.
pub struct RosterEntry {
    pub provider: Arc<dyn LlmProvider>,
    pub models: Vec<ModelSpec>,
}

impl std::fmt::Debug for RosterEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterEntry")
            .field("provider", &self.provider.name())
            .field("models", &self.models)
            .finish()
    }
}

/// Ordered collection of providers and their models.
#[derive(Debug, Default)]
pub struct ModelRoster {
    entries: Vec<RosterEntry>,
}

impl ModelRoster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider serving the given models.
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>, models: Vec<ModelSpec>) -> Self {
        self.entries.push(RosterEntry { provider, models });
        self
    }

    /// Builds the roster for every provider section present in `config`.
    pub fn from_config(config: &ForgeConfig) -> Result<Self, LlmError> {
        let mut roster = Self::new();

        if let Some(settings) = &config.openrouter {
            let provider = OpenRouterProvider::with_custom_url(
                settings.api_key.clone(),
                settings.base_url.clone(),
                config.request_timeout,
            )?;
            info!(
                key = %provider.api_key_masked(),
                models = settings.models.len(),
                "OpenRouter provider configured"
            );
            roster = roster.with_provider(Arc::new(provider), settings.models.clone());
        }

        if let Some(settings) = &config.gemini {
            let provider = GeminiProvider::with_custom_url(
                settings.api_key.clone(),
                settings.base_url.clone(),
                config.request_timeout,
            )?;
            info!(
                key = %provider.api_key_masked(),
                models = settings.models.len(),
                "Gemini provider configured"
            );
            roster = roster.with_provider(Arc::new(provider), settings.models.clone());
        }

        Ok(roster)
    }

    /// Provider entries in insertion order.
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Every `(provider, model)` pair in roster order.
    pub fn assignments(&self) -> impl Iterator<Item = (&Arc<dyn LlmProvider>, &ModelSpec)> {
        self.entries
            .iter()
            .flat_map(|e| e.models.iter().map(move |m| (&e.provider, m)))
    }

    /// Total number of models.
    pub fn model_count(&self) -> usize {
        self.entries.iter().map(|e| e.models.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.model_count() == 0
    }
}
