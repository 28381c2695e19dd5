//! Query and query history endpoints

use axum::extract::{Path, Query, State};
use tracing::debug;
use uuid::Uuid;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, Json, QueryDetailResponse, QueryHistoryParams, QueryHistoryResponse,
    QueryRequestBody, QueryResponse,
};

/// POST /v1/query - Answer a question with citations
pub async fn create_query(
    State(state): State<AppState>,
    Json(body): Json<QueryRequestBody>,
) -> Result<Json<QueryResponse>, ApiError> {
    debug!(scopes = body.scope_ids.len(), "Answering query");

    let outcome = state.rag_service.query(body.into()).await?;

    Ok(Json(QueryResponse::from(outcome)))
}

/// GET /v1/queries?scope_id= - Query history, newest first
pub async fn list_queries(
    State(state): State<AppState>,
    Query(params): Query<QueryHistoryParams>,
) -> Result<Json<QueryHistoryResponse>, ApiError> {
    let queries = state
        .rag_service
        .list_queries(params.scope_id.as_deref())
        .await?;

    Ok(Json(QueryHistoryResponse { queries }))
}

/// GET /v1/queries/{query_id} - One record with the chunks it was answered from
pub async fn get_query(
    State(state): State<AppState>,
    Path(query_id): Path<String>,
) -> Result<Json<QueryDetailResponse>, ApiError> {
    let id = Uuid::parse_str(&query_id)
        .map_err(|_| ApiError::bad_request(format!("Invalid query id '{}'", query_id)).with_param("query_id"))?;

    let detail = state
        .rag_service
        .get_query(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Query '{}' not found", query_id)))?;

    Ok(Json(QueryDetailResponse::from(detail)))
}
