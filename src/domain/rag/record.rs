//! Query history records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answer::RagAnswer;
use super::citation::Citation;
use crate::domain::DomainError;

/// A completed query, captured for later review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: Uuid,
    pub query_text: String,
    /// Query of the last retrieval cycle, after revisions
    pub final_query: String,
    pub scope_ids: Vec<String>,
    pub response_text: String,
    pub citations: Vec<Citation>,
    pub retrieved_chunk_ids: Vec<String>,
    pub revision_count: u32,
    pub created_at: DateTime<Utc>,
}

impl QueryRecord {
    pub fn from_answer(query_text: impl Into<String>, scope_ids: Vec<String>, answer: &RagAnswer) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_text: query_text.into(),
            final_query: answer.final_query.clone(),
            scope_ids,
            response_text: answer.answer.clone(),
            citations: answer.citations.clone(),
            retrieved_chunk_ids: answer.retrieved_chunk_ids.clone(),
            revision_count: answer.revision_count,
            created_at: Utc::now(),
        }
    }

    pub fn has_scope(&self, scope_id: &str) -> bool {
        self.scope_ids.iter().any(|s| s == scope_id)
    }
}

/// Repository trait for query record persistence
#[async_trait]
pub trait QueryRecordRepository: Send + Sync + std::fmt::Debug {
    async fn create(&self, record: QueryRecord) -> Result<QueryRecord, DomainError>;

    async fn get(&self, id: Uuid) -> Result<Option<QueryRecord>, DomainError>;

    /// Records for a scope, newest first; all records when `scope_id` is `None`
    async fn list(&self, scope_id: Option<&str>) -> Result<Vec<QueryRecord>, DomainError>;

    /// Drop the records of a scope, returning how many were removed
    async fn delete_by_scope(&self, scope_id: &str) -> Result<usize, DomainError>;
}

/// In-memory implementation of QueryRecordRepository
pub mod in_memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    pub struct InMemoryQueryRecordRepository {
        records: RwLock<HashMap<Uuid, QueryRecord>>,
    }

    impl InMemoryQueryRecordRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl QueryRecordRepository for InMemoryQueryRecordRepository {
        async fn create(&self, record: QueryRecord) -> Result<QueryRecord, DomainError> {
            let mut records = self.records.write().await;

            if records.contains_key(&record.id) {
                return Err(DomainError::validation(format!(
                    "Query record '{}' already exists",
                    record.id
                )));
            }

            records.insert(record.id, record.clone());
            Ok(record)
        }

        async fn get(&self, id: Uuid) -> Result<Option<QueryRecord>, DomainError> {
            Ok(self.records.read().await.get(&id).cloned())
        }

        async fn list(&self, scope_id: Option<&str>) -> Result<Vec<QueryRecord>, DomainError> {
            let records = self.records.read().await;

            let mut matching: Vec<QueryRecord> = records
                .values()
                .filter(|r| scope_id.map_or(true, |s| r.has_scope(s)))
                .cloned()
                .collect();

            matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(matching)
        }

        async fn delete_by_scope(&self, scope_id: &str) -> Result<usize, DomainError> {
            let mut records = self.records.write().await;
            let before = records.len();
            records.retain(|_, r| !r.has_scope(scope_id));
            Ok(before - records.len())
        }
    }
}
