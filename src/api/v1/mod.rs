//! Versioned document and query endpoints

pub mod documents;
pub mod queries;

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/documents", post(documents::ingest_document))
        .route("/documents/{document_id}", delete(documents::delete_document))
        .route("/scopes/{scope_id}", delete(documents::delete_scope))
        .route("/query", post(queries::create_query))
        .route("/queries", get(queries::list_queries))
        .route("/queries/{query_id}", get(queries::get_query))
}
