//! HTTP request, response and error types

pub mod error;
pub mod json;
pub mod rag;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use rag::{
    DeleteDocumentResponse, DeleteScopeResponse, IngestDocumentRequest, QueryDetailResponse,
    QueryHistoryParams, QueryHistoryResponse, QueryRequestBody, QueryResponse,
};
