//! RAG service - ingestion, scoped querying and query history

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::index::{Chunk, MetadataFilter};
use crate::domain::ingestion::{validate_scope_id, DocumentInput, IngestionResult};
use crate::domain::rag::{QueryRecord, QueryRecordRepository, RagAnswer};
use crate::domain::DomainError;
use crate::infrastructure::ingestion::IngestionPipeline;
use crate::infrastructure::rag::RagController;

/// A question to answer, optionally confined to some scopes
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    /// Chunks must belong to at least one of these scopes
    pub scope_ids: Vec<String>,
    /// Extra metadata constraint, AND-ed with the scope restriction
    pub filter: Option<MetadataFilter>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_ids.push(scope_id.into());
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.query.trim().is_empty() {
            return Err(DomainError::validation("Query text cannot be empty"));
        }

        for scope_id in &self.scope_ids {
            validate_scope_id(scope_id)?;
        }

        Ok(())
    }

    /// Filter handed to retrieval, `None` when unrestricted
    pub fn effective_filter(&self) -> Option<MetadataFilter> {
        let scope = (!self.scope_ids.is_empty())
            .then(|| MetadataFilter::any_scope(self.scope_ids.iter().cloned()));

        match (scope, self.filter.clone().filter(|f| !f.is_empty())) {
            (Some(scope), Some(extra)) => Some(MetadataFilter::and(vec![scope, extra])),
            (scope, extra) => scope.or(extra),
        }
    }
}

/// Answer plus the history record written for it
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub record: QueryRecord,
    pub answer: RagAnswer,
}

/// A history record with the chunks it was answered from
#[derive(Debug, Clone, Serialize)]
pub struct QueryDetail {
    pub record: QueryRecord,
    /// Chunks still present in the index, in retrieval order
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScopeDeletion {
    pub chunks_removed: usize,
    pub queries_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub index: &'static str,
    pub index_healthy: bool,
    pub indexed_chunks: usize,
    pub completion_targets: usize,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.index_healthy && self.completion_targets > 0
    }
}

/// Trait for the RAG service (for dynamic dispatch in AppState)
#[async_trait]
pub trait RagServiceTrait: Send + Sync + Debug {
    async fn ingest(&self, input: DocumentInput) -> Result<IngestionResult, DomainError>;

    /// Remove a document's chunks, returning how many were removed
    async fn delete_document(&self, document_id: &str) -> Result<usize, DomainError>;

    /// Detach a scope from the index and drop its query history
    async fn delete_scope(&self, scope_id: &str) -> Result<ScopeDeletion, DomainError>;

    /// Answer a question and record it
    async fn query(&self, request: QueryRequest) -> Result<QueryOutcome, DomainError>;

    async fn list_queries(&self, scope_id: Option<&str>) -> Result<Vec<QueryRecord>, DomainError>;

    async fn get_query(&self, id: Uuid) -> Result<Option<QueryDetail>, DomainError>;

    async fn readiness(&self) -> Readiness;
}

/// RAG service implementation
#[derive(Debug, Clone)]
pub struct RagService {
    pipeline: IngestionPipeline,
    controller: RagController,
    records: Arc<dyn QueryRecordRepository>,
}

impl RagService {
    pub fn new(
        pipeline: IngestionPipeline,
        controller: RagController,
        records: Arc<dyn QueryRecordRepository>,
    ) -> Self {
        Self {
            pipeline,
            controller,
            records,
        }
    }

    pub fn controller(&self) -> &RagController {
        &self.controller
    }
}

#[async_trait]
impl RagServiceTrait for RagService {
    async fn ingest(&self, input: DocumentInput) -> Result<IngestionResult, DomainError> {
        self.pipeline.ingest(input).await
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, DomainError> {
        let removed = self.pipeline.delete_document(document_id).await?;

        if removed == 0 {
            return Err(DomainError::not_found(format!(
                "Document '{}' not found",
                document_id
            )));
        }

        info!(document_id, removed, "Document deleted");
        Ok(removed)
    }

    async fn delete_scope(&self, scope_id: &str) -> Result<ScopeDeletion, DomainError> {
        validate_scope_id(scope_id)?;

        let chunks_removed = self.controller.index().delete_by_scope(scope_id).await?;
        let queries_removed = self.records.delete_by_scope(scope_id).await?;

        info!(scope_id, chunks_removed, queries_removed, "Scope deleted");

        Ok(ScopeDeletion {
            chunks_removed,
            queries_removed,
        })
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryOutcome, DomainError> {
        request.validate()?;

        let answer = self
            .controller
            .run(&request.query, request.effective_filter())
            .await;

        let record = QueryRecord::from_answer(&request.query, request.scope_ids.clone(), &answer);
        let record = self.records.create(record).await?;

        Ok(QueryOutcome { record, answer })
    }

    async fn list_queries(&self, scope_id: Option<&str>) -> Result<Vec<QueryRecord>, DomainError> {
        if let Some(scope_id) = scope_id {
            validate_scope_id(scope_id)?;
        }

        self.records.list(scope_id).await
    }

    async fn get_query(&self, id: Uuid) -> Result<Option<QueryDetail>, DomainError> {
        let Some(record) = self.records.get(id).await? else {
            return Ok(None);
        };

        let chunks = self
            .controller
            .index()
            .get_by_ids(&record.retrieved_chunk_ids)
            .await?
            .into_iter()
            .map(|indexed| indexed.chunk)
            .collect();

        Ok(Some(QueryDetail { record, chunks }))
    }

    async fn readiness(&self) -> Readiness {
        let index = self.controller.index();

        let index_healthy = match index.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(index = index.index_type(), error = %e, "Index health check failed");
                false
            }
        };

        Readiness {
            index: index.index_type(),
            index_healthy,
            indexed_chunks: index.count().await.unwrap_or(0),
            completion_targets: self.controller.generator().chain().targets().len(),
        }
    }
}
