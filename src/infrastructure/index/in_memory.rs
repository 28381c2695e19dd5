//! In-memory vector index with exact cosine search

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::embedding::cosine_distance;
use crate::domain::index::{
    FilterCondition, FilterConnector, FilterOperator, FilterValue, IndexedChunk, MetadataFilter,
    ReplaceResult, RetrievedCandidate, VectorIndex,
};
use crate::domain::DomainError;

/// Vector index held in process memory.
///
/// Every write takes the write lock for its whole duration, so readers see
/// an entry either before or after a write, never in between.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorIndex {
    entries: Arc<RwLock<HashMap<String, StoredChunk>>>,
}

#[derive(Debug, Clone)]
struct StoredChunk {
    indexed: IndexedChunk,
    metadata: HashMap<String, Value>,
}

impl StoredChunk {
    fn new(indexed: IndexedChunk) -> Self {
        let metadata = indexed.chunk.metadata();
        Self { indexed, metadata }
    }
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn index_type(&self) -> &'static str {
        "in_memory"
    }

    async fn upsert(&self, chunk: IndexedChunk) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        entries.insert(chunk.id().to_string(), StoredChunk::new(chunk));
        Ok(())
    }

    async fn upsert_batch(&self, chunks: Vec<IndexedChunk>) -> Result<usize, DomainError> {
        let mut entries = self.entries.write().await;
        let count = chunks.len();

        for chunk in chunks {
            entries.insert(chunk.id().to_string(), StoredChunk::new(chunk));
        }

        Ok(count)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievedCandidate>, DomainError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;

        let mut scored: Vec<(f32, &StoredChunk)> = entries
            .values()
            .filter(|stored| filter.is_none_or(|f| matches_filter(&stored.metadata, f)))
            .map(|stored| {
                (
                    cosine_distance(query_embedding, &stored.indexed.embedding),
                    stored,
                )
            })
            .collect();

        scored.sort_by(|(da, a), (db, b)| {
            da.total_cmp(db)
                .then_with(|| a.indexed.id().cmp(b.indexed.id()))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, stored)| RetrievedCandidate {
                chunk: stored.indexed.chunk.clone(),
                distance: Some(distance),
                metadata: stored.metadata.clone(),
            })
            .collect())
    }

    async fn replace_document(
        &self,
        document_id: &str,
        chunks: Vec<IndexedChunk>,
    ) -> Result<ReplaceResult, DomainError> {
        if let Some(foreign) = chunks
            .iter()
            .find(|c| c.chunk.source_document_id != document_id)
        {
            return Err(DomainError::index(format!(
                "Chunk '{}' belongs to document '{}', not '{}'",
                foreign.id(),
                foreign.chunk.source_document_id,
                document_id
            )));
        }

        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, stored| stored.indexed.chunk.source_document_id != document_id);
        let removed = before - entries.len();

        let inserted = chunks.len();
        for chunk in chunks {
            entries.insert(chunk.id().to_string(), StoredChunk::new(chunk));
        }

        Ok(ReplaceResult::new(removed, inserted))
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<IndexedChunk>, DomainError> {
        let entries = self.entries.read().await;

        Ok(ids
            .iter()
            .filter_map(|id| entries.get(id))
            .map(|stored| stored.indexed.clone())
            .collect())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize, DomainError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|_, stored| stored.indexed.chunk.source_document_id != document_id);

        Ok(before - entries.len())
    }

    /// Returns how many chunks left the scope, whether detached or deleted
    async fn delete_by_scope(&self, scope_id: &str) -> Result<usize, DomainError> {
        let mut entries = self.entries.write().await;
        let mut affected = 0;

        entries.retain(|_, stored| {
            if !stored.indexed.chunk.belongs_to(scope_id) {
                return true;
            }

            affected += 1;
            stored.indexed.chunk.scope_ids.remove(scope_id);
            if stored.indexed.chunk.scope_ids.is_empty() {
                return false;
            }

            stored.metadata = stored.indexed.chunk.metadata();
            true
        });

        Ok(affected)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.entries.read().await.len())
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(true)
    }
}

/// Check if chunk metadata matches a filter
fn matches_filter(metadata: &HashMap<String, Value>, filter: &MetadataFilter) -> bool {
    match filter {
        MetadataFilter::Condition(condition) => matches_condition(metadata, condition),
        MetadataFilter::Group { connector, filters } => match connector {
            FilterConnector::And => filters.iter().all(|f| matches_filter(metadata, f)),
            FilterConnector::Or => filters.iter().any(|f| matches_filter(metadata, f)),
        },
    }
}

fn matches_condition(metadata: &HashMap<String, Value>, condition: &FilterCondition) -> bool {
    let value = metadata.get(&condition.key);

    match condition.operator {
        FilterOperator::Eq => condition
            .value
            .as_ref()
            .is_some_and(|v| compare_eq(value, v)),
        FilterOperator::Ne => condition
            .value
            .as_ref()
            .is_none_or(|v| !compare_eq(value, v)),
        FilterOperator::In => condition
            .value
            .as_ref()
            .is_some_and(|v| v.as_list().into_iter().any(|item| compare_eq(value, item))),
        FilterOperator::NotIn => condition
            .value
            .as_ref()
            .is_none_or(|v| !v.as_list().into_iter().any(|item| compare_eq(value, item))),
        FilterOperator::ContainsAny => condition.value.as_ref().is_some_and(|v| {
            let wanted = v.as_list();
            list_items(value).is_some_and(|items| {
                wanted
                    .into_iter()
                    .any(|w| items.iter().any(|item| compare_eq(Some(item), w)))
            })
        }),
        FilterOperator::ContainsAll => condition.value.as_ref().is_some_and(|v| {
            let wanted = v.as_list();
            list_items(value).is_some_and(|items| {
                wanted
                    .into_iter()
                    .all(|w| items.iter().any(|item| compare_eq(Some(item), w)))
            })
        }),
        FilterOperator::Exists => value.is_some(),
        FilterOperator::NotExists => value.is_none(),
    }
}

/// A list field, or a scalar viewed as a one-element list
fn list_items(value: Option<&Value>) -> Option<Vec<&Value>> {
    match value? {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Null => None,
        scalar => Some(vec![scalar]),
    }
}

/// Compare a metadata value with a filter value for equality
fn compare_eq(value: Option<&Value>, filter_value: &FilterValue) -> bool {
    match (value, filter_value) {
        (Some(Value::String(s)), FilterValue::String(fs)) => s == fs,
        (Some(Value::Number(n)), FilterValue::Integer(fi)) => n.as_i64() == Some(*fi),
        (Some(Value::Number(n)), FilterValue::Float(ff)) => {
            n.as_f64().is_some_and(|f| (f - ff).abs() < f64::EPSILON)
        }
        (Some(Value::Bool(b)), FilterValue::Boolean(fb)) => b == fb,
        (Some(Value::Null), FilterValue::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index::Chunk;

    fn indexed(doc: &str, idx: usize, scopes: &[&str], embedding: Vec<f32>) -> IndexedChunk {
        let chunk = scopes.iter().fold(
            Chunk::new(doc, idx, format!("{} chunk {}", doc, idx)),
            |chunk, scope| chunk.with_scope(*scope),
        );
        IndexedChunk::new(chunk, embedding)
    }

    #[tokio::test]
    async fn test_search_orders_by_ascending_distance() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_batch(vec![
                indexed("doc-a", 0, &["case-1"], vec![0.0, 1.0]),
                indexed("doc-a", 1, &["case-1"], vec![1.0, 0.0]),
                indexed("doc-a", 2, &["case-1"], vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = index.search(&[1.0, 0.0], 3, None).await.unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-a_chunk_1", "doc-a_chunk_2", "doc-a_chunk_0"]);
        assert!(results[0].distance.unwrap() < 1e-6);
        assert!(results
            .windows(2)
            .all(|w| w[0].distance.unwrap() <= w[1].distance.unwrap()));
    }

    #[tokio::test]
    async fn test_upsert_same_id_overwrites() {
        let index = InMemoryVectorIndex::new();

        index
            .upsert(indexed("doc-a", 0, &["case-1"], vec![1.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(indexed("doc-a", 0, &["case-1"], vec![0.0, 1.0]))
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let stored = index
            .get_by_ids(&["doc-a_chunk_0".to_string()])
            .await
            .unwrap();
        assert_eq!(stored[0].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_scope_filter_isolates_tenants() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_batch(vec![
                indexed("doc-a", 0, &["case-a"], vec![1.0, 0.0]),
                indexed("doc-b", 0, &["case-b"], vec![1.0, 0.0]),
                indexed("doc-shared", 0, &["case-a", "case-b"], vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let filter = MetadataFilter::scope("case-a");
        let results = index.search(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.chunk.belongs_to("case-a")));
        assert!(results.iter().all(|r| r.document_id() != "doc-b"));
    }

    #[tokio::test]
    async fn test_any_scope_and_document_filters() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_batch(vec![
                indexed("doc-a", 0, &["case-a"], vec![1.0, 0.0]),
                indexed("doc-b", 0, &["case-b"], vec![1.0, 0.0]),
                indexed("doc-c", 0, &["case-c"], vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let any = MetadataFilter::any_scope(["case-a", "case-b"]);
        assert_eq!(index.search(&[1.0, 0.0], 10, Some(&any)).await.unwrap().len(), 2);

        let combined = MetadataFilter::and(vec![any, MetadataFilter::document("doc-b")]);
        let results = index
            .search(&[1.0, 0.0], 10, Some(&combined))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id(), "doc-b");
    }

    #[tokio::test]
    async fn test_replace_document_drops_stale_chunks() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_batch(vec![
                indexed("doc-a", 0, &["case-1"], vec![1.0]),
                indexed("doc-a", 1, &["case-1"], vec![1.0]),
                indexed("doc-a", 2, &["case-1"], vec![1.0]),
                indexed("doc-b", 0, &["case-1"], vec![1.0]),
            ])
            .await
            .unwrap();

        let result = index
            .replace_document("doc-a", vec![indexed("doc-a", 0, &["case-1"], vec![0.5])])
            .await
            .unwrap();

        assert_eq!(result, ReplaceResult::new(3, 1));
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_replace_rejects_foreign_chunks() {
        let index = InMemoryVectorIndex::new();
        let result = index
            .replace_document("doc-a", vec![indexed("doc-b", 0, &["s"], vec![1.0])])
            .await;

        assert!(matches!(result, Err(DomainError::Index(_))));
    }

    #[tokio::test]
    async fn test_delete_by_scope_detaches_shared_chunks() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_batch(vec![
                indexed("doc-a", 0, &["case-a"], vec![1.0]),
                indexed("doc-s", 0, &["case-a", "case-b"], vec![1.0]),
                indexed("doc-b", 0, &["case-b"], vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(index.delete_by_scope("case-a").await.unwrap(), 2);
        assert_eq!(index.count().await.unwrap(), 2);

        let filter = MetadataFilter::scope("case-a");
        assert!(index
            .search(&[1.0], 10, Some(&filter))
            .await
            .unwrap()
            .is_empty());

        let shared = index
            .get_by_ids(&["doc-s_chunk_0".to_string()])
            .await
            .unwrap();
        assert!(shared[0].chunk.belongs_to("case-b"));
    }

    #[tokio::test]
    async fn test_delete_by_document() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_batch(vec![
                indexed("doc-a", 0, &["s"], vec![1.0]),
                indexed("doc-a", 1, &["s"], vec![1.0]),
                indexed("doc-b", 0, &["s"], vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(index.delete_by_document("doc-a").await.unwrap(), 2);
        assert_eq!(index.delete_by_document("doc-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_by_ids_keeps_requested_order() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_batch(vec![
                indexed("doc-a", 0, &["s"], vec![1.0]),
                indexed("doc-a", 1, &["s"], vec![1.0]),
            ])
            .await
            .unwrap();

        let chunks = index
            .get_by_ids(&[
                "doc-a_chunk_1".to_string(),
                "missing".to_string(),
                "doc-a_chunk_0".to_string(),
            ])
            .await
            .unwrap();

        let ids: Vec<&str> = chunks.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["doc-a_chunk_1", "doc-a_chunk_0"]);
    }

    #[test]
    fn test_condition_operators() {
        let mut metadata = HashMap::new();
        metadata.insert("page_number".to_string(), Value::from(4));
        metadata.insert("section_title".to_string(), Value::from("Décision"));

        assert!(matches_condition(&metadata, &FilterCondition::eq("page_number", 4i64)));
        assert!(matches_condition(&metadata, &FilterCondition::ne("page_number", 5i64)));
        assert!(matches_condition(
            &metadata,
            &FilterCondition::in_list("page_number", vec![3i64.into(), 4i64.into()])
        ));
        assert!(matches_condition(
            &metadata,
            &FilterCondition::not_in_list("section_title", vec!["Faits".into()])
        ));
        assert!(matches_condition(&metadata, &FilterCondition::exists("section_title")));
        assert!(matches_condition(&metadata, &FilterCondition::not_exists("clause_number")));
        assert!(!matches_condition(
            &metadata,
            &FilterCondition::contains_all("clause_number", vec!["1".into()])
        ));
    }
}
