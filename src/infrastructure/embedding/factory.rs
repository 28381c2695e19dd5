use std::sync::Arc;

use serde::Deserialize;

use super::{HttpClient, NomicEmbeddingProvider, OpenAiEmbeddingProvider};
use crate::domain::{DomainError, EmbeddingProvider};
use crate::infrastructure::llm::resolve_api_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    #[default]
    Nomic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl EmbeddingProviderKind {
    fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::Nomic => "NOMIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

/// Embedding provider settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingProviderConfig {
    #[serde(rename = "type", default)]
    pub kind: EmbeddingProviderKind,
    /// Overrides the provider's default model
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl EmbeddingProviderConfig {
    fn key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }
}

/// Factory for creating embedding providers
#[derive(Debug)]
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    pub fn create(
        config: &EmbeddingProviderConfig,
        http_client: HttpClient,
    ) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), &[config.key_env()])
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "No API key for {:?} embedding provider (set {})",
                    config.kind,
                    config.key_env()
                ))
            })?;

        let provider: Arc<dyn EmbeddingProvider> = match (config.kind, config.base_url.as_deref())
        {
            (EmbeddingProviderKind::Nomic, Some(url)) => Arc::new(
                NomicEmbeddingProvider::with_base_url(http_client, api_key, url),
            ),
            (EmbeddingProviderKind::Nomic, None) => {
                Arc::new(NomicEmbeddingProvider::new(http_client, api_key))
            }
            (EmbeddingProviderKind::OpenAi, Some(url)) => Arc::new(
                OpenAiEmbeddingProvider::with_base_url(http_client, api_key, url),
            ),
            (EmbeddingProviderKind::OpenAi, None) => {
                Arc::new(OpenAiEmbeddingProvider::new(http_client, api_key))
            }
        };

        Ok(provider)
    }
}
