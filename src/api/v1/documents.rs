//! Document and scope endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, DeleteDocumentResponse, DeleteScopeResponse, IngestDocumentRequest, Json,
};

/// POST /v1/documents - Index (or re-index) a document
pub async fn ingest_document(
    State(state): State<AppState>,
    Json(request): Json<IngestDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    debug!(document_id = %request.document_id, "Ingesting document");

    let result = state.rag_service.ingest(request.into()).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// DELETE /v1/documents/{document_id}
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<DeleteDocumentResponse>, ApiError> {
    let chunks_removed = state.rag_service.delete_document(&document_id).await?;

    Ok(Json(DeleteDocumentResponse {
        document_id,
        chunks_removed,
    }))
}

/// DELETE /v1/scopes/{scope_id} - Detach a scope and drop its query history
pub async fn delete_scope(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
) -> Result<Json<DeleteScopeResponse>, ApiError> {
    let deletion = state.rag_service.delete_scope(&scope_id).await?;

    Ok(Json(DeleteScopeResponse {
        scope_id,
        chunks_removed: deletion.chunks_removed,
        queries_removed: deletion.queries_removed,
    }))
}
