//! Reranked retrieval candidates

use serde::{Deserialize, Serialize};

use crate::domain::index::{Chunk, RetrievedCandidate};

/// Distance assumed when scoring candidates whose index reported none
pub const MISSING_DISTANCE: f32 = 1.0;

/// A retrieved candidate with a relevance score against the raw query text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: RetrievedCandidate,
    pub relevance_score: f32,
}

impl RankedCandidate {
    pub fn new(candidate: RetrievedCandidate, relevance_score: f32) -> Self {
        Self {
            candidate,
            relevance_score,
        }
    }

    /// Rank by vector distance alone: relevance is `1 - distance`
    pub fn from_distance(candidate: RetrievedCandidate) -> Self {
        let distance = candidate.distance.unwrap_or(MISSING_DISTANCE);
        Self::new(candidate, 1.0 - distance)
    }

    pub fn chunk(&self) -> &Chunk {
        &self.candidate.chunk
    }

    pub fn document_id(&self) -> &str {
        &self.candidate.chunk.source_document_id
    }

    pub fn page_number(&self) -> Option<u32> {
        self.candidate.chunk.page_number
    }
}

/// Stable sort by ascending distance, missing distances last
pub fn sort_by_distance(candidates: &mut [RetrievedCandidate]) {
    candidates.sort_by(|a, b| {
        let da = a.distance.unwrap_or(f32::INFINITY);
        let db = b.distance.unwrap_or(f32::INFINITY);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
}
