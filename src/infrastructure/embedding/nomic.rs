//! Nomic Atlas embedding provider

use async_trait::async_trait;
use serde::Deserialize;

use super::HttpClientTrait;
use crate::domain::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};
use crate::domain::DomainError;

const DEFAULT_NOMIC_BASE_URL: &str = "https://api-atlas.nomic.ai";

/// Nomic embedding provider.
///
/// nomic-embed-text is asymmetric: passages are embedded with the
/// `search_document` task type and questions with `search_query`.
#[derive(Debug)]
pub struct NomicEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> NomicEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_NOMIC_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_header: format!("Bearer {}", api_key.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn embedding_url(&self) -> String {
        format!("{}/v1/embedding/text", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &EmbeddingRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model(),
            "texts": request.inputs(),
            "task_type": request.task().as_task_type(),
        });

        if let Some(dims) = request.dimensions() {
            body["dimensionality"] = serde_json::json!(dims);
        }

        body
    }

    fn parse_response(
        &self,
        model: &str,
        expected: usize,
        json: serde_json::Value,
    ) -> Result<EmbeddingResponse, DomainError> {
        let response: NomicEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("nomic", format!("Failed to parse embedding response: {}", e))
        })?;

        if response.embeddings.len() != expected {
            return Err(DomainError::provider(
                "nomic",
                format!(
                    "Expected {} embeddings, got {}",
                    expected,
                    response.embeddings.len()
                ),
            ));
        }

        let embeddings = response
            .embeddings
            .into_iter()
            .enumerate()
            .map(|(idx, vector)| Embedding::new(idx, vector))
            .collect();

        let tokens = response.usage.map(|u| u.total_tokens).unwrap_or_default();

        Ok(EmbeddingResponse::new(
            response.model.unwrap_or_else(|| model.to_string()),
            embeddings,
            EmbeddingUsage::new(tokens, tokens),
        ))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for NomicEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let url = self.embedding_url();
        let body = self.build_request(&request);

        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| match e {
                DomainError::Provider { message, .. } => DomainError::provider("nomic", message),
                other => other,
            })?;

        self.parse_response(request.model(), request.input().len(), response)
    }

    fn provider_name(&self) -> &'static str {
        "nomic"
    }

    fn default_model(&self) -> &'static str {
        "nomic-embed-text-v1.5"
    }

    fn dimensions(&self, model: &str) -> Option<usize> {
        match model {
            "nomic-embed-text-v1.5" | "nomic-embed-text-v1" => Some(768),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NomicEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<NomicUsage>,
}

#[derive(Debug, Deserialize)]
struct NomicUsage {
    #[serde(default)]
    total_tokens: u32,
}
