//! Ingestion input and result types

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::validation::{validate_document_id, validate_scope_id};
use crate::domain::DomainError;

/// A cleaned-or-raw text document to be indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub document_id: String,
    /// Scopes (cases, tenants) this document belongs to
    pub scope_ids: BTreeSet<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause_number: Option<String>,
}

impl DocumentInput {
    pub fn new(document_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            scope_ids: BTreeSet::new(),
            text: text.into(),
            filename: None,
            page_number: None,
            section_title: None,
            clause_number: None,
        }
    }

    pub fn with_scope(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_ids.insert(scope_id.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_page_number(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }

    pub fn with_section_title(mut self, title: impl Into<String>) -> Self {
        self.section_title = Some(title.into());
        self
    }

    pub fn with_clause_number(mut self, clause: impl Into<String>) -> Self {
        self.clause_number = Some(clause.into());
        self
    }

    /// Validate the document and scope identifiers
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_document_id(&self.document_id)?;

        for scope_id in &self.scope_ids {
            validate_scope_id(scope_id)?;
        }

        Ok(())
    }
}

/// Result of ingesting a single document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub document_id: String,
    /// Chunks written for the current version of the document
    pub chunks_indexed: usize,
    /// Chunks of a previous version that were removed
    pub chunks_replaced: usize,
    /// Chunks whose vector came from a fallback path
    pub embedding_fallbacks: usize,
}

impl IngestionResult {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            chunks_indexed: 0,
            chunks_replaced: 0,
            embedding_fallbacks: 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.embedding_fallbacks > 0
    }
}
