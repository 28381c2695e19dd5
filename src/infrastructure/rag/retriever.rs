//! Query-time retrieval: embed the query and over-fetch candidates

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::index::{MetadataFilter, RetrievedCandidate, VectorIndex};
use crate::domain::rag::RetrievalConfig;
use crate::domain::DomainError;
use crate::infrastructure::embedding::ContextualEmbedder;
use crate::infrastructure::observability::record_embedding_fallback;

#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: ContextualEmbedder,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: ContextualEmbedder,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Fetch `candidate_count()` nearest chunks matching `filter`.
    ///
    /// A failed query embedding degrades to a zero vector rather than an
    /// error; index failures are returned.
    pub async fn retrieve(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievedCandidate>, DomainError> {
        let embedding = match self.embedder.embed_query(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(
                    provider = self.embedder.provider_name(),
                    error = %e,
                    "Query embedding failed, searching with a zero vector"
                );
                record_embedding_fallback("query");
                vec![0.0; self.embedder.fallback_dimensions()]
            }
        };

        let candidates = self
            .index
            .search(&embedding, self.config.candidate_count(), filter)
            .await?;

        debug!(
            candidates = candidates.len(),
            requested = self.config.candidate_count(),
            "Retrieved candidates"
        );

        Ok(candidates)
    }
}
