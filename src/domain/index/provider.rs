//! Vector index trait

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::chunk::{IndexedChunk, RetrievedCandidate};
use super::filter::MetadataFilter;
use crate::domain::error::DomainError;

/// Outcome of replacing all chunks of a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceResult {
    pub removed: usize,
    pub inserted: usize,
}

impl ReplaceResult {
    pub fn new(removed: usize, inserted: usize) -> Self {
        Self { removed, inserted }
    }
}

/// Storage of chunk vectors with filtered nearest-neighbour search.
///
/// Writes for one chunk id are atomic from a reader's point of view: a
/// concurrent `search` sees either the previous or the new vector, never a
/// partially written entry.
#[async_trait]
pub trait VectorIndex: Send + Sync + Debug {
    /// Backend name, used in logs and readiness checks
    fn index_type(&self) -> &'static str;

    /// Insert or overwrite a single chunk by id
    async fn upsert(&self, chunk: IndexedChunk) -> Result<(), DomainError>;

    /// Insert or overwrite many chunks; returns the number written
    async fn upsert_batch(&self, chunks: Vec<IndexedChunk>) -> Result<usize, DomainError>;

    /// Nearest neighbours by ascending cosine distance
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievedCandidate>, DomainError>;

    /// Atomically drop every chunk of `document_id` and insert `chunks`
    async fn replace_document(
        &self,
        document_id: &str,
        chunks: Vec<IndexedChunk>,
    ) -> Result<ReplaceResult, DomainError>;

    /// Fetch chunks by id, skipping unknown ids, in the order requested
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<IndexedChunk>, DomainError>;

    async fn delete_by_document(&self, document_id: &str) -> Result<usize, DomainError>;

    /// Detach `scope_id` from every chunk, deleting chunks left with no scope
    async fn delete_by_scope(&self, scope_id: &str) -> Result<usize, DomainError>;

    async fn count(&self) -> Result<usize, DomainError>;

    async fn health_check(&self) -> Result<bool, DomainError>;
}
