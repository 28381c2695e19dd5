//! Ingestion input validation

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::DomainError;

/// Maximum length for document and scope identifiers
pub const MAX_ID_LENGTH: usize = 64;

/// Largest chunk size accepted from configuration
pub const MAX_CHUNK_SIZE: usize = 100_000;

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:-]*$").expect("identifier pattern is valid")
});

/// Identifier validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum IdValidationError {
    Empty { kind: &'static str },
    TooLong { kind: &'static str, length: usize, max: usize },
    InvalidFormat { kind: &'static str, id: String },
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { kind } => write!(f, "{} ID cannot be empty", kind),
            Self::TooLong { kind, length, max } => write!(
                f,
                "{} ID too long: {} characters (max {})",
                kind, length, max
            ),
            Self::InvalidFormat { kind, id } => write!(
                f,
                "Invalid {} ID format '{}': must start alphanumeric and contain only letters, digits, '.', '_', ':' or '-'",
                kind.to_lowercase(),
                id
            ),
        }
    }
}

impl std::error::Error for IdValidationError {}

impl From<IdValidationError> for DomainError {
    fn from(err: IdValidationError) -> Self {
        DomainError::invalid_id(err.to_string())
    }
}

fn validate_id(kind: &'static str, id: &str) -> Result<(), IdValidationError> {
    if id.is_empty() {
        return Err(IdValidationError::Empty { kind });
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(IdValidationError::TooLong {
            kind,
            length: id.len(),
            max: MAX_ID_LENGTH,
        });
    }

    if !ID_PATTERN.is_match(id) {
        return Err(IdValidationError::InvalidFormat {
            kind,
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Validate a source document identifier
pub fn validate_document_id(id: &str) -> Result<(), IdValidationError> {
    validate_id("Document", id)
}

/// Validate a scope (case / tenant) identifier
pub fn validate_scope_id(id: &str) -> Result<(), IdValidationError> {
    validate_id("Scope", id)
}

/// Validate chunk size parameters
pub fn validate_chunk_params(chunk_size: usize, chunk_overlap: usize) -> Result<(), DomainError> {
    if chunk_size == 0 {
        return Err(DomainError::validation("Chunk size must be greater than 0"));
    }

    if chunk_size > MAX_CHUNK_SIZE {
        return Err(DomainError::validation(
            "Chunk size cannot exceed 100,000 characters",
        ));
    }

    if chunk_overlap >= chunk_size {
        return Err(DomainError::validation(
            "Chunk overlap must be less than chunk size",
        ));
    }

    Ok(())
}
