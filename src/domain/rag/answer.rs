//! Engine output types

use serde::{Deserialize, Serialize};

use super::citation::Citation;
use super::state::PipelineState;

/// Answer text returned when every completion provider failed
pub const GENERATION_FAILED_MARKER: &str =
    "[Generation failed: no completion provider produced an answer. Please retry later.]";

/// Result of one draft generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub answer_text: String,
    pub citations: Vec<Citation>,
    /// Whether `answer_text` is the failure marker
    pub failed: bool,
}

impl GeneratedAnswer {
    pub fn new(answer_text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            answer_text: answer_text.into(),
            citations,
            failed: false,
        }
    }

    pub fn failure() -> Self {
        Self {
            answer_text: GENERATION_FAILED_MARKER.to_string(),
            citations: Vec::new(),
            failed: true,
        }
    }
}

/// Final result of `run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub retrieved_chunk_count: usize,
    pub revision_count: u32,
    /// Ids of the chunks the final draft was written from
    pub retrieved_chunk_ids: Vec<String>,
    /// Search query of the final cycle
    pub final_query: String,
    pub generation_failed: bool,
    /// Whether the run stopped on its wall-clock deadline
    pub deadline_exceeded: bool,
}

impl RagAnswer {
    pub fn from_state(state: PipelineState, deadline_exceeded: bool) -> Self {
        let retrieved_chunk_ids = state.retrieved_chunk_ids();

        // A deadline can fire before the first draft exists.
        let (answer, generation_failed) = if state.draft_answer.is_empty() {
            (GENERATION_FAILED_MARKER.to_string(), true)
        } else {
            (state.draft_answer, state.generation_failed)
        };

        Self {
            answer,
            citations: state.citations,
            retrieved_chunk_count: retrieved_chunk_ids.len(),
            revision_count: state.revision_count,
            retrieved_chunk_ids,
            final_query: state.query,
            generation_failed,
            deadline_exceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_has_no_citations() {
        let failed = GeneratedAnswer::failure();
        assert!(failed.failed);
        assert!(failed.citations.is_empty());
        assert_eq!(failed.answer_text, GENERATION_FAILED_MARKER);
    }

    #[test]
    fn test_from_state_without_draft_uses_marker() {
        let state = PipelineState::new("q", None);
        let answer = RagAnswer::from_state(state, true);

        assert!(answer.generation_failed);
        assert!(answer.deadline_exceeded);
        assert_eq!(answer.answer, GENERATION_FAILED_MARKER);
        assert_eq!(answer.retrieved_chunk_count, 0);
    }

    #[test]
    fn test_from_state_with_draft() {
        let mut state = PipelineState::new("q", None).revise(Some("q2".into()));
        state.draft_answer = "answer".to_string();
        state.citations.push(Citation::bare("D1", Some(1)));

        let answer = RagAnswer::from_state(state, false);
        assert_eq!(answer.answer, "answer");
        assert_eq!(answer.revision_count, 1);
        assert_eq!(answer.final_query, "q2");
        assert_eq!(answer.citations.len(), 1);
        assert!(!answer.generation_failed);
    }
}
