//! Cross-encoder reranking with a distance-order fallback

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::index::RetrievedCandidate;
use crate::domain::rag::{sort_by_distance, RankedCandidate};
use crate::domain::rerank::{RerankProvider, RerankRequest, RerankResult};
use crate::domain::DomainError;
use crate::infrastructure::llm::DEFAULT_CALL_TIMEOUT;
use crate::infrastructure::observability::{record_rerank, RerankMode};

/// Reorders candidates by relevance to the raw query text.
///
/// Without a provider, or when the provider fails, candidates are ranked by
/// ascending vector distance instead.
#[derive(Debug, Clone)]
pub struct Reranker {
    provider: Option<Arc<dyn RerankProvider>>,
    model: Option<String>,
    call_timeout: Duration,
}

impl Reranker {
    pub fn new(provider: Option<Arc<dyn RerankProvider>>) -> Self {
        Self {
            provider,
            model: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Distance-only ranking
    pub fn distance_only() -> Self {
        Self::new(None)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Best `top_k` candidates, descending by relevance
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedCandidate>,
        top_k: usize,
    ) -> Vec<RankedCandidate> {
        if candidates.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let start = Instant::now();

        let Some(provider) = self.provider.as_ref() else {
            let ranked = rank_by_distance(candidates, top_k);
            record_rerank(RerankMode::Fallback, start.elapsed());
            return ranked;
        };

        match self.call_provider(provider.as_ref(), query, &candidates, top_k).await {
            Ok(results) => match apply_results(&candidates, &results, top_k) {
                Some(ranked) => {
                    record_rerank(RerankMode::Provider, start.elapsed());
                    debug!(
                        provider = provider.provider_name(),
                        kept = ranked.len(),
                        "Candidates reranked"
                    );
                    ranked
                }
                None => {
                    warn!(
                        provider = provider.provider_name(),
                        "Rerank response referenced no known candidate, ranking by distance"
                    );
                    record_rerank(RerankMode::Fallback, start.elapsed());
                    rank_by_distance(candidates, top_k)
                }
            },
            Err(e) => {
                warn!(
                    provider = provider.provider_name(),
                    error = %e,
                    "Rerank provider failed, ranking by distance"
                );
                record_rerank(RerankMode::Fallback, start.elapsed());
                rank_by_distance(candidates, top_k)
            }
        }
    }

    async fn call_provider(
        &self,
        provider: &dyn RerankProvider,
        query: &str,
        candidates: &[RetrievedCandidate],
        top_k: usize,
    ) -> Result<Vec<RerankResult>, DomainError> {
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        let documents = candidates.iter().map(|c| c.chunk.text.clone()).collect();
        let request = RerankRequest::new(model, query, documents, top_k);

        match timeout(self.call_timeout, provider.rerank(request)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::timeout(format!(
                "{} rerank did not answer within {}ms",
                provider.provider_name(),
                self.call_timeout.as_millis()
            ))),
        }
    }
}

/// Fallback ranking: ascending distance, relevance `1 - distance`
fn rank_by_distance(mut candidates: Vec<RetrievedCandidate>, top_k: usize) -> Vec<RankedCandidate> {
    sort_by_distance(&mut candidates);

    candidates
        .into_iter()
        .take(top_k)
        .map(RankedCandidate::from_distance)
        .collect()
}

/// Map provider results back onto candidates, dropping unknown or repeated
/// indices. `None` when nothing usable remains.
fn apply_results(
    candidates: &[RetrievedCandidate],
    results: &[RerankResult],
    top_k: usize,
) -> Option<Vec<RankedCandidate>> {
    let mut seen = HashSet::new();

    let mut ranked: Vec<RankedCandidate> = results
        .iter()
        .filter(|r| r.index < candidates.len() && seen.insert(r.index))
        .map(|r| RankedCandidate::new(candidates[r.index].clone(), r.relevance_score))
        .collect();

    if ranked.is_empty() {
        return None;
    }

    ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    ranked.truncate(top_k);

    Some(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index::Chunk;
    use crate::domain::rerank::MockRerankProvider;

    fn candidates(distances: &[Option<f32>]) -> Vec<RetrievedCandidate> {
        distances
            .iter()
            .enumerate()
            .map(|(i, d)| RetrievedCandidate::new(Chunk::new("doc", i, format!("text {}", i)), *d))
            .collect()
    }

    fn ids(ranked: &[RankedCandidate]) -> Vec<usize> {
        ranked.iter().map(|r| r.chunk().chunk_index).collect()
    }

    #[tokio::test]
    async fn test_provider_order_wins() {
        let provider = Arc::new(MockRerankProvider::new().with_scores(vec![(3, 0.9), (0, 0.5), (2, 0.1)]));
        let reranker = Reranker::new(Some(provider.clone()));

        let ranked = reranker
            .rerank("q", candidates(&[Some(0.1), Some(0.2), Some(0.3), Some(0.4)]), 2)
            .await;

        assert_eq!(ids(&ranked), vec![3, 0]);
        assert_eq!(ranked[0].relevance_score, 0.9);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_distance() {
        let provider = Arc::new(MockRerankProvider::new().with_error("HTTP 500"));
        let reranker = Reranker::new(Some(provider));

        let ranked = reranker
            .rerank(
                "q",
                candidates(&[Some(0.5), Some(0.1), Some(0.9), Some(0.3), Some(0.2)]),
                3,
            )
            .await;

        assert_eq!(ranked.len(), 3);
        assert_eq!(ids(&ranked), vec![1, 4, 3]);
        assert!((ranked[0].relevance_score - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_distance_ranks_last() {
        let ranked = Reranker::distance_only()
            .rerank("q", candidates(&[None, Some(0.4), Some(0.2)]), 3)
            .await;

        assert_eq!(ids(&ranked), vec![2, 1, 0]);
        assert_eq!(ranked[2].relevance_score, 0.0);
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_provider() {
        let provider = Arc::new(MockRerankProvider::new().with_scores(vec![(0, 1.0)]));
        let reranker = Reranker::new(Some(provider.clone()));

        assert!(reranker.rerank("q", Vec::new(), 3).await.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_indices_dropped() {
        let provider =
            Arc::new(MockRerankProvider::new().with_scores(vec![(7, 0.99), (1, 0.8), (1, 0.7)]));
        let reranker = Reranker::new(Some(provider));

        let ranked = reranker
            .rerank("q", candidates(&[Some(0.1), Some(0.2)]), 3)
            .await;

        assert_eq!(ids(&ranked), vec![1]);
    }

    #[tokio::test]
    async fn test_only_unknown_indices_uses_fallback() {
        let provider = Arc::new(MockRerankProvider::new().with_scores(vec![(9, 0.99)]));
        let reranker = Reranker::new(Some(provider));

        let ranked = reranker
            .rerank("q", candidates(&[Some(0.6), Some(0.2)]), 1)
            .await;

        assert_eq!(ids(&ranked), vec![1]);
    }

    #[tokio::test]
    async fn test_fewer_candidates_than_top_k() {
        let ranked = Reranker::distance_only()
            .rerank("q", candidates(&[Some(0.3)]), 3)
            .await;
        assert_eq!(ranked.len(), 1);
    }
}
