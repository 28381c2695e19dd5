use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use super::completion::CompletionChain;
use super::http_client::HttpClient;
use super::openai::{DEFAULT_GROQ_BASE_URL, DEFAULT_OPENAI_BASE_URL};
use super::{AnthropicProvider, OpenAiProvider};
use crate::domain::{DomainError, LlmProvider};

/// Wire protocol of a completion provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionProviderKind {
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Groq's OpenAI-compatible endpoint
    Groq,
    Anthropic,
}

impl CompletionProviderKind {
    fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// One entry of the ordered completion chain
#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
    #[serde(rename = "type")]
    pub kind: CompletionProviderKind,
    /// Models to try in order on this provider
    pub models: Vec<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Explicit key; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl LlmProviderConfig {
    pub fn new(kind: CompletionProviderKind, models: Vec<String>) -> Self {
        Self {
            kind,
            models,
            base_url: None,
            api_key: None,
            api_key_env: None,
        }
    }

    /// Groq first, OpenAI second
    pub fn default_chain() -> Vec<Self> {
        vec![
            Self::new(
                CompletionProviderKind::Groq,
                vec!["llama-3.1-70b-versatile".to_string()],
            ),
            Self::new(
                CompletionProviderKind::OpenAi,
                vec!["gpt-4-turbo-preview".to_string()],
            ),
        ]
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        let env_name = self
            .api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env());

        resolve_api_key(self.api_key.as_deref(), &[env_name])
    }
}

/// Explicit key if non-empty, otherwise the first non-empty variable
pub fn resolve_api_key(explicit: Option<&str>, env_names: &[&str]) -> Option<String> {
    if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
        return Some(key.to_string());
    }

    env_names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Factory for creating completion providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    pub fn create(
        config: &LlmProviderConfig,
        http_client: HttpClient,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            DomainError::configuration(format!(
                "No API key for {:?} provider (set {})",
                config.kind,
                config
                    .api_key_env
                    .as_deref()
                    .unwrap_or_else(|| config.kind.default_api_key_env())
            ))
        })?;

        let provider: Arc<dyn LlmProvider> = match config.kind {
            CompletionProviderKind::OpenAi => Arc::new(OpenAiProvider::with_base_url(
                http_client,
                api_key,
                config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL),
            )),
            CompletionProviderKind::Groq => Arc::new(
                OpenAiProvider::with_base_url(
                    http_client,
                    api_key,
                    config.base_url.as_deref().unwrap_or(DEFAULT_GROQ_BASE_URL),
                )
                .with_name("groq"),
            ),
            CompletionProviderKind::Anthropic => match config.base_url.as_deref() {
                Some(base_url) => Arc::new(AnthropicProvider::with_base_url(
                    http_client,
                    api_key,
                    base_url,
                )),
                None => Arc::new(AnthropicProvider::new(http_client, api_key)),
            },
        };

        Ok(provider)
    }

    /// Build the ordered chain, skipping providers that cannot be created
    pub fn build_chain(configs: &[LlmProviderConfig], call_timeout: Duration) -> CompletionChain {
        let mut chain = CompletionChain::new(call_timeout);

        for config in configs {
            if config.models.is_empty() {
                warn!(provider = ?config.kind, "Completion provider has no models, skipping");
                continue;
            }

            match Self::create(config, HttpClient::new()) {
                Ok(provider) => {
                    info!(
                        provider = provider.provider_name(),
                        models = ?config.models,
                        "Completion provider enabled"
                    );
                    chain = chain.with_target(provider, config.models.clone());
                }
                Err(e) => warn!(provider = ?config.kind, error = %e, "Completion provider skipped"),
            }
        }

        chain
    }
}
