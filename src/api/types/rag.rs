//! Request and response bodies of the document and query endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::index::{Chunk, MetadataFilter};
use crate::domain::ingestion::DocumentInput;
use crate::domain::rag::{Citation, QueryRecord};
use crate::infrastructure::services::{QueryDetail, QueryOutcome, QueryRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct IngestDocumentRequest {
    pub document_id: String,
    pub text: String,
    #[serde(default)]
    pub scope_ids: Vec<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub clause_number: Option<String>,
}

impl From<IngestDocumentRequest> for DocumentInput {
    fn from(request: IngestDocumentRequest) -> Self {
        let mut input = DocumentInput::new(request.document_id, request.text);
        input.scope_ids = request.scope_ids.into_iter().collect();
        input.filename = request.filename;
        input.page_number = request.page_number;
        input.section_title = request.section_title;
        input.clause_number = request.clause_number;
        input
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteDocumentResponse {
    pub document_id: String,
    pub chunks_removed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteScopeResponse {
    pub scope_id: String,
    pub chunks_removed: usize,
    pub queries_removed: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequestBody {
    pub query: String,
    #[serde(default)]
    pub scope_ids: Vec<String>,
    #[serde(default)]
    pub filter: Option<MetadataFilter>,
}

impl From<QueryRequestBody> for QueryRequest {
    fn from(body: QueryRequestBody) -> Self {
        QueryRequest {
            query: body.query,
            scope_ids: body.scope_ids,
            filter: body.filter,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query_id: Uuid,
    pub response: String,
    pub citations: Vec<Citation>,
    pub retrieved_chunks: usize,
    pub revision_count: u32,
    pub final_query: String,
    pub generation_failed: bool,
    pub deadline_exceeded: bool,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        let answer = outcome.answer;
        Self {
            query_id: outcome.record.id,
            response: answer.answer,
            citations: answer.citations,
            retrieved_chunks: answer.retrieved_chunk_count,
            revision_count: answer.revision_count,
            final_query: answer.final_query,
            generation_failed: answer.generation_failed,
            deadline_exceeded: answer.deadline_exceeded,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryHistoryParams {
    pub scope_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryHistoryResponse {
    pub queries: Vec<QueryRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryDetailResponse {
    #[serde(flatten)]
    pub record: QueryRecord,
    pub retrieved_chunks: Vec<Chunk>,
}

impl From<QueryDetail> for QueryDetailResponse {
    fn from(detail: QueryDetail) -> Self {
        Self {
            record: detail.record,
            retrieved_chunks: detail.chunks,
        }
    }
}
