//! Indexed chunk types

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key holding the owning document id
pub const META_DOCUMENT_ID: &str = "document_id";
/// Metadata key holding the list of scope ids
pub const META_SCOPE_IDS: &str = "scope_ids";

/// Build the deterministic id of the `index`-th chunk of a document
pub fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{}_chunk_{}", document_id, index)
}

/// A contiguous span of a source document, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source_document_id: String,
    pub scope_ids: BTreeSet<String>,
    /// Ordinal within the source document
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Chunk {
    pub fn new(
        source_document_id: impl Into<String>,
        chunk_index: usize,
        text: impl Into<String>,
    ) -> Self {
        let source_document_id = source_document_id.into();

        Self {
            id: chunk_id(&source_document_id, chunk_index),
            text: text.into(),
            source_document_id,
            scope_ids: BTreeSet::new(),
            chunk_index,
            page_number: None,
            section_title: None,
            clause_number: None,
            filename: None,
        }
    }

    pub fn with_scope(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_ids.insert(scope_id.into());
        self
    }

    pub fn with_scopes(mut self, scope_ids: BTreeSet<String>) -> Self {
        self.scope_ids = scope_ids;
        self
    }

    pub fn with_page_number(mut self, page: Option<u32>) -> Self {
        self.page_number = page;
        self
    }

    pub fn with_section_title(mut self, title: Option<String>) -> Self {
        self.section_title = title;
        self
    }

    pub fn with_clause_number(mut self, clause: Option<String>) -> Self {
        self.clause_number = clause;
        self
    }

    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename;
        self
    }

    pub fn belongs_to(&self, scope_id: &str) -> bool {
        self.scope_ids.contains(scope_id)
    }

    /// Flattened metadata view used by filters and API responses
    pub fn metadata(&self) -> HashMap<String, Value> {
        let mut metadata = HashMap::new();
        metadata.insert(
            META_DOCUMENT_ID.to_string(),
            Value::String(self.source_document_id.clone()),
        );
        metadata.insert(
            META_SCOPE_IDS.to_string(),
            Value::Array(
                self.scope_ids
                    .iter()
                    .map(|s| Value::String(s.clone()))
                    .collect(),
            ),
        );
        metadata.insert("chunk_index".to_string(), Value::from(self.chunk_index));

        if let Some(page) = self.page_number {
            metadata.insert("page_number".to_string(), Value::from(page));
        }
        if let Some(ref title) = self.section_title {
            metadata.insert("section_title".to_string(), Value::String(title.clone()));
        }
        if let Some(ref clause) = self.clause_number {
            metadata.insert("clause_number".to_string(), Value::String(clause.clone()));
        }
        if let Some(ref filename) = self.filename {
            metadata.insert("filename".to_string(), Value::String(filename.clone()));
        }

        metadata
    }
}

/// A chunk together with its current embedding
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

impl IndexedChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

/// A search hit: chunk plus its cosine distance to the query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    pub chunk: Chunk,
    /// `None` when the backing index did not report a distance
    pub distance: Option<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl RetrievedCandidate {
    pub fn new(chunk: Chunk, distance: Option<f32>) -> Self {
        let metadata = chunk.metadata();
        Self {
            chunk,
            distance,
            metadata,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.chunk.source_document_id
    }
}
