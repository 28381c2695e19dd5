//! RAG engine configuration types

use serde::{Deserialize, Serialize};

use crate::domain::ingestion::ChunkingConfig;
use crate::domain::DomainError;

/// Context-aware ("late chunking") embedding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateChunkingConfig {
    /// Weight of the window embedding; the document embedding gets `1 - alpha`
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Characters of context on each side of a chunk
    #[serde(default = "default_window_radius")]
    pub window_radius: usize,
    /// Document text beyond this many characters is not embedded
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
    /// Length of the zero vector stored when every embedding attempt fails
    #[serde(default = "default_fallback_dimensions")]
    pub fallback_dimensions: usize,
}

fn default_alpha() -> f32 {
    0.7
}

fn default_window_radius() -> usize {
    1000
}

fn default_max_document_chars() -> usize {
    32_768 * 4
}

fn default_fallback_dimensions() -> usize {
    768
}

impl Default for LateChunkingConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            window_radius: default_window_radius(),
            max_document_chars: default_max_document_chars(),
            fallback_dimensions: default_fallback_dimensions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Nominal result count; the retriever over-fetches a multiple of it
    #[serde(default = "default_n_results")]
    pub n_results: usize,
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
    /// Candidates kept after reranking
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_n_results() -> usize {
    10
}

fn default_candidate_multiplier() -> usize {
    2
}

fn default_top_k() -> usize {
    3
}

impl RetrievalConfig {
    pub fn candidate_count(&self) -> usize {
        self.n_results * self.candidate_multiplier.max(1)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            n_results: default_n_results(),
            candidate_multiplier: default_candidate_multiplier(),
            top_k: default_top_k(),
        }
    }
}

/// Sampling parameters for one kind of completion call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionSettings {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

fn default_draft() -> CompletionSettings {
    CompletionSettings::new(2000, 0.7)
}

fn default_critique() -> CompletionSettings {
    CompletionSettings::new(500, 0.3)
}

fn default_revision() -> CompletionSettings {
    CompletionSettings::new(200, 0.5)
}

fn default_max_revisions() -> u32 {
    3
}

fn default_synthetic_citations() -> usize {
    3
}

fn default_run_timeout_secs() -> u64 {
    300
}

fn default_system_prompt() -> String {
    "You are a legal assistant helping with French administrative law cases.".to_string()
}

/// Configuration for the whole retrieval / generation / critique engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub late_chunking: LateChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default = "default_draft")]
    pub draft: CompletionSettings,
    #[serde(default = "default_critique")]
    pub critique: CompletionSettings,
    #[serde(default = "default_revision")]
    pub revision: CompletionSettings,
    /// Upper bound on query rewrites; the loop runs at most this plus one cycles
    #[serde(default = "default_max_revisions")]
    pub max_revisions: u32,
    /// Citations synthesised from top candidates when an answer has none
    #[serde(default = "default_synthetic_citations")]
    pub synthetic_citations: usize,
    /// Wall-clock budget for one `run`
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    /// System message for the drafting call
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            late_chunking: LateChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            draft: default_draft(),
            critique: default_critique(),
            revision: default_revision(),
            max_revisions: default_max_revisions(),
            synthetic_citations: default_synthetic_citations(),
            run_timeout_secs: default_run_timeout_secs(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl RagConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_revisions(mut self, max_revisions: u32) -> Self {
        self.max_revisions = max_revisions;
        self
    }

    pub fn with_run_timeout_secs(mut self, secs: u64) -> Self {
        self.run_timeout_secs = secs;
        self
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.retrieval.top_k = top_k;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.chunking.validate()?;

        if !(0.0..=1.0).contains(&self.late_chunking.alpha) {
            return Err(DomainError::validation(
                "late_chunking.alpha must be between 0.0 and 1.0",
            ));
        }

        if self.retrieval.top_k == 0 || self.retrieval.n_results == 0 {
            return Err(DomainError::validation(
                "retrieval.top_k and retrieval.n_results must be greater than 0",
            ));
        }

        if self.run_timeout_secs == 0 {
            return Err(DomainError::validation(
                "run_timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.max_revisions, 3);
        assert_eq!(config.retrieval.candidate_count(), 20);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.late_chunking.max_document_chars, 131_072);
        assert_eq!(config.draft.max_tokens, 2000);
        assert_eq!(config.critique, CompletionSettings::new(500, 0.3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialization() {
        let config: RagConfig =
            serde_json::from_str(r#"{"max_revisions": 1, "retrieval": {"top_k": 5}}"#).unwrap();
        assert_eq!(config.max_revisions, 1);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.n_results, 10);
        assert_eq!(config.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_validation_rejects_bad_alpha() {
        let mut config = RagConfig::default();
        config.late_chunking.alpha = 1.5;
        assert!(config.validate().is_err());
    }
}
