//! Chunking strategy trait and types

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Configuration for chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DomainError> {
        super::validation::validate_chunk_params(self.chunk_size, self.chunk_overlap)
    }

    /// Distance between the starts of two consecutive chunks
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// A contiguous span of a document, addressed in characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    /// Ordinal of this span within its document (0-based)
    pub index: usize,
    pub content: String,
    /// Character offset where this span starts
    pub char_start: usize,
    /// Character offset one past the end of this span
    pub char_end: usize,
}

impl TextSpan {
    pub fn new(index: usize, content: impl Into<String>, char_start: usize, char_end: usize) -> Self {
        Self {
            index,
            content: content.into(),
            char_start,
            char_end,
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Trait for chunking strategies
pub trait ChunkingStrategy: Send + Sync + Debug {
    /// Split text into ordered spans. Must be a pure function of its inputs.
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Result<Vec<TextSpan>, DomainError>;

    /// Get the strategy name
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.step(), 800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        assert!(ChunkingConfig::new(100, 100).validate().is_err());
        assert!(ChunkingConfig::new(0, 0).validate().is_err());
    }

    #[test]
    fn test_span_len() {
        let span = TextSpan::new(0, "héllo", 10, 15);
        assert_eq!(span.char_len(), 5);
    }
}
