//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::services::RagServiceTrait;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone, Debug)]
pub struct AppState {
    pub rag_service: Arc<dyn RagServiceTrait>,
}

impl AppState {
    pub fn new(rag_service: Arc<dyn RagServiceTrait>) -> Self {
        Self { rag_service }
    }
}
