//! Citation extraction and resolution

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::candidate::RankedCandidate;

static CITATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[Document\s+([^,\]]+?)\s*,\s*Page\s+([^,\]]+?)\s*(?:,\s*Section:\s*([^\]]*?)\s*)?\]",
    )
    .expect("citation pattern is valid")
});

/// A structured pointer substantiating a claim in an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause_number: Option<String>,
    /// Chunk backing the citation; `None` for a bare citation
    pub chunk_id: Option<String>,
}

impl Citation {
    /// Citation with no backing chunk
    pub fn bare(document_id: impl Into<String>, page_number: Option<u32>) -> Self {
        Self {
            document_id: document_id.into(),
            page_number,
            section_title: None,
            clause_number: None,
            chunk_id: None,
        }
    }

    pub fn from_candidate(candidate: &RankedCandidate) -> Self {
        let chunk = candidate.chunk();
        Self {
            document_id: chunk.source_document_id.clone(),
            page_number: chunk.page_number,
            section_title: chunk.section_title.clone(),
            clause_number: chunk.clause_number.clone(),
            chunk_id: Some(chunk.id.clone()),
        }
    }

    pub fn is_bare(&self) -> bool {
        self.chunk_id.is_none()
    }
}

/// A citation marker as written by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationMarker {
    pub document_id: String,
    /// Raw page text, kept for de-duplication even when not numeric
    pub page: String,
    pub section_title: Option<String>,
}

impl CitationMarker {
    pub fn page_number(&self) -> Option<u32> {
        self.page.trim().parse().ok()
    }
}

/// Find `[Document D, Page P, Section: S]` markers, one per distinct (D, P)
pub fn parse_citation_markers(answer: &str) -> Vec<CitationMarker> {
    let mut seen = HashSet::new();
    let mut markers = Vec::new();

    for captures in CITATION_PATTERN.captures_iter(answer) {
        let document_id = captures[1].trim().to_string();
        let page = captures[2].trim().to_string();

        if !seen.insert((document_id.clone(), page.clone())) {
            continue;
        }

        let section_title = captures
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        markers.push(CitationMarker {
            document_id,
            page,
            section_title,
        });
    }

    markers
}

/// Resolve a marker to the candidate that backs it.
///
/// Exact (document, page) match first, then the first candidate of the
/// same document, then a bare citation. A marker is never dropped.
pub fn resolve_marker(marker: &CitationMarker, candidates: &[RankedCandidate]) -> Citation {
    let page = marker.page_number();

    let exact = candidates
        .iter()
        .find(|c| c.document_id() == marker.document_id && page.is_some() && c.page_number() == page);

    let matched = exact.or_else(|| {
        candidates
            .iter()
            .find(|c| c.document_id() == marker.document_id)
    });

    match matched {
        Some(candidate) => {
            let mut citation = Citation::from_candidate(candidate);
            if citation.section_title.is_none() {
                citation.section_title = marker.section_title.clone();
            }
            citation
        }
        None => {
            let mut citation = Citation::bare(marker.document_id.clone(), page);
            citation.section_title = marker.section_title.clone();
            citation
        }
    }
}

/// Extract and resolve every citation marker in `answer`
pub fn extract_citations(answer: &str, candidates: &[RankedCandidate]) -> Vec<Citation> {
    parse_citation_markers(answer)
        .iter()
        .map(|marker| resolve_marker(marker, candidates))
        .collect()
}

/// One citation per top-ranked candidate, for answers with no markers
pub fn synthesize_citations(candidates: &[RankedCandidate], count: usize) -> Vec<Citation> {
    candidates
        .iter()
        .take(count)
        .map(Citation::from_candidate)
        .collect()
}
