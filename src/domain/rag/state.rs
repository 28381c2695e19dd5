//! Per-query pipeline state and control-loop transitions

use serde::{Deserialize, Serialize};

use super::candidate::RankedCandidate;
use super::citation::Citation;
use crate::domain::index::MetadataFilter;

/// Outcome of the critique step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CritiqueVerdict {
    Accept,
    Revise,
}

impl CritiqueVerdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Stages of the retrieve / draft / critique / revise loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Retrieve,
    Draft,
    Critique,
    Revise,
    Accept,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieve => "retrieve",
            Self::Draft => "draft",
            Self::Critique => "critique",
            Self::Revise => "revise",
            Self::Accept => "accept",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Stage following a critique.
///
/// `Revise` only while revisions remain; once `revision_count` reaches
/// `max_revisions` the draft is accepted whatever the verdict.
pub fn after_critique(verdict: CritiqueVerdict, revision_count: u32, max_revisions: u32) -> Stage {
    match verdict {
        CritiqueVerdict::Revise if revision_count < max_revisions => Stage::Revise,
        _ => Stage::Accept,
    }
}

/// The record threaded through one query's execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Question as asked by the caller
    pub original_query: String,
    /// Current search query, rewritten on each revision
    pub query: String,
    pub scope_filter: Option<MetadataFilter>,
    pub retrieved: Vec<RankedCandidate>,
    pub draft_answer: String,
    pub critique_verdict: Option<CritiqueVerdict>,
    /// Raw critique text of the last cycle
    pub critique: Option<String>,
    pub citations: Vec<Citation>,
    pub revision_count: u32,
    /// Whether the current draft is the generation failure marker
    pub generation_failed: bool,
}

impl PipelineState {
    pub fn new(query: impl Into<String>, scope_filter: Option<MetadataFilter>) -> Self {
        let query = query.into();
        Self {
            original_query: query.clone(),
            query,
            scope_filter,
            retrieved: Vec::new(),
            draft_answer: String::new(),
            critique_verdict: None,
            critique: None,
            citations: Vec::new(),
            revision_count: 0,
            generation_failed: false,
        }
    }

    /// Prepare the next cycle: count the revision, adopt the rewritten
    /// query (if any), and clear per-cycle results. The scope filter stays.
    pub fn revise(mut self, rewritten_query: Option<String>) -> Self {
        self.revision_count += 1;

        if let Some(query) = rewritten_query.filter(|q| !q.trim().is_empty()) {
            self.query = query.trim().to_string();
        }

        self.retrieved.clear();
        self.draft_answer.clear();
        self.critique_verdict = None;
        self.critique = None;
        self.citations.clear();
        self.generation_failed = false;
        self
    }

    pub fn retrieved_chunk_ids(&self) -> Vec<String> {
        self.retrieved.iter().map(|c| c.chunk().id.clone()).collect()
    }
}
