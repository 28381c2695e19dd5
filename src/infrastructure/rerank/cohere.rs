//! Cohere-compatible rerank provider

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::rerank::{RerankProvider, RerankRequest, RerankResult};
use crate::domain::DomainError;
use crate::infrastructure::llm::HttpClientTrait;

const DEFAULT_COHERE_BASE_URL: &str = "https://api.cohere.ai";

/// Cross-encoder reranker speaking the Cohere `/v1/rerank` protocol
#[derive(Debug)]
pub struct CohereRerankProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> CohereRerankProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_COHERE_BASE_URL)
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

    fn rerank_url(&self) -> String {
        format!("{}/v1/rerank", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &RerankRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model,
            "query": request.query,
            "documents": request.documents,
            "top_n": request.top_n,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Vec<RerankResult>, DomainError> {
        let response: CohereRerankResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("cohere", format!("Failed to parse rerank response: {}", e))
        })?;

        let mut results: Vec<RerankResult> = response
            .results
            .into_iter()
            .map(|r| RerankResult::new(r.index, r.relevance_score))
            .collect();

        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        Ok(results)
    }
}

#[async_trait]
impl<C: HttpClientTrait> RerankProvider for CohereRerankProvider<C> {
    async fn rerank(&self, request: RerankRequest) -> Result<Vec<RerankResult>, DomainError> {
        let url = self.rerank_url();
        let body = self.build_request(&request);

        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| match e {
                DomainError::Provider { message, .. } => DomainError::provider("cohere", message),
                other => other,
            })?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "cohere"
    }

    fn default_model(&self) -> &'static str {
        "rerank-english-v3.0"
    }
}

#[derive(Debug, Deserialize)]
struct CohereRerankResponse {
    results: Vec<CohereRerankResult>,
}

#[derive(Debug, Deserialize)]
struct CohereRerankResult {
    index: usize,
    relevance_score: f32,
}
