use std::sync::Arc;

use serde::Deserialize;

use super::CohereRerankProvider;
use crate::domain::{DomainError, RerankProvider};
use crate::infrastructure::llm::{resolve_api_key, HttpClient};

const RERANK_KEY_ENVS: &[&str] = &["RERANKER_API_KEY", "COHERE_API_KEY"];

/// Rerank provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct RerankProviderConfig {
    /// Set to false to always rank by vector distance
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for RerankProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            model: None,
            base_url: None,
            api_key: None,
            api_key_env: None,
        }
    }
}

#[derive(Debug)]
pub struct RerankProviderFactory;

impl RerankProviderFactory {
    /// `Ok(None)` when reranking is disabled
    pub fn create(
        config: &RerankProviderConfig,
        http_client: HttpClient,
    ) -> Result<Option<Arc<dyn RerankProvider>>, DomainError> {
        if !config.enabled {
            return Ok(None);
        }

        let api_key = match config.api_key_env.as_deref() {
            Some(env) => resolve_api_key(config.api_key.as_deref(), &[env]),
            None => resolve_api_key(config.api_key.as_deref(), RERANK_KEY_ENVS),
        }
        .ok_or_else(|| {
            DomainError::configuration("No API key for rerank provider (set RERANKER_API_KEY)")
        })?;

        let provider = match config.base_url.as_deref() {
            Some(url) => CohereRerankProvider::with_base_url(http_client, api_key, url),
            None => CohereRerankProvider::new(http_client, api_key),
        };

        Ok(Some(Arc::new(provider)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_yields_none() {
        let config = RerankProviderConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(RerankProviderFactory::create(&config, HttpClient::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_explicit_key() {
        let config = RerankProviderConfig {
            enabled: true,
            api_key: Some("co-key".to_string()),
            ..Default::default()
        };
        let provider = RerankProviderFactory::create(&config, HttpClient::new())
            .unwrap()
            .unwrap();
        assert_eq!(provider.default_model(), "rerank-english-v3.0");
    }

    #[test]
    fn test_missing_key() {
        let config = RerankProviderConfig {
            enabled: true,
            api_key_env: Some("CITERAG_TEST_UNSET_KEY_VARIABLE".to_string()),
            ..Default::default()
        };
        assert!(RerankProviderFactory::create(&config, HttpClient::new()).is_err());
    }

    #[test]
    fn test_enabled_by_default_when_deserialized() {
        let config: RerankProviderConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
    }
}
