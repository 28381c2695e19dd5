//! Document ingestion domain types and traits
//!
//! This module provides:
//! - `ChunkingStrategy` trait for splitting documents into spans
//! - `clean_text` for normalising extracted text before chunking
//! - Input, result and validation helpers for the ingestion pipeline

pub mod chunker;
pub mod cleaner;
pub mod document;
pub mod validation;

pub use chunker::{ChunkingConfig, ChunkingStrategy, TextSpan};
pub use cleaner::clean_text;
pub use document::{DocumentInput, IngestionResult};
pub use validation::{
    validate_chunk_params, validate_document_id, validate_scope_id, IdValidationError,
};
