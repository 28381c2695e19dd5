use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Request to score documents against a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankRequest {
    pub model: String,
    pub query: String,
    pub documents: Vec<String>,
    pub top_n: usize,
}

impl RerankRequest {
    pub fn new(
        model: impl Into<String>,
        query: impl Into<String>,
        documents: Vec<String>,
        top_n: usize,
    ) -> Self {
        Self {
            model: model.into(),
            query: query.into(),
            documents,
            top_n,
        }
    }
}

/// One scored document, referring back to its position in the request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    pub index: usize,
    pub relevance_score: f32,
}

impl RerankResult {
    pub fn new(index: usize, relevance_score: f32) -> Self {
        Self {
            index,
            relevance_score,
        }
    }
}

/// Trait for reranking providers (Cohere, Jina, ...)
#[async_trait]
pub trait RerankProvider: Send + Sync + Debug {
    /// Score `(query, document)` pairs, best first
    async fn rerank(&self, request: RerankRequest) -> Result<Vec<RerankResult>, DomainError>;

    fn provider_name(&self) -> &'static str;

    fn default_model(&self) -> &'static str;
}
