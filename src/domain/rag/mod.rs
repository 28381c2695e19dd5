//! RAG domain - candidates, citations, pipeline state and query history
//!
//! The orchestration itself (retrieval, generation, critique) lives in
//! `infrastructure::rag`; this module holds the pure types and rules it
//! threads through each stage.

mod answer;
mod candidate;
mod citation;
mod config;
mod record;
mod state;

pub use answer::{GeneratedAnswer, RagAnswer, GENERATION_FAILED_MARKER};
pub use candidate::{sort_by_distance, RankedCandidate, MISSING_DISTANCE};
pub use citation::{
    extract_citations, parse_citation_markers, resolve_marker, synthesize_citations, Citation,
    CitationMarker,
};
pub use config::{CompletionSettings, LateChunkingConfig, RagConfig, RetrievalConfig};
pub use record::{in_memory::InMemoryQueryRecordRepository, QueryRecord, QueryRecordRepository};
pub use state::{after_critique, CritiqueVerdict, PipelineState, Stage};
