//! Bounded retrieve / draft / critique / revise loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use super::critic::Critic;
use super::generator::AnswerGenerator;
use super::reranker::Reranker;
use super::retriever::Retriever;
use super::reviser::QueryReviser;
use crate::domain::index::{MetadataFilter, VectorIndex};
use crate::domain::rag::{
    after_critique, CritiqueVerdict, PipelineState, RagAnswer, RagConfig, Stage,
};
use crate::domain::rerank::RerankProvider;
use crate::infrastructure::embedding::ContextualEmbedder;
use crate::infrastructure::llm::CompletionChain;
use crate::infrastructure::observability::record_rag_run;

/// Runs one query through the critique loop.
///
/// The loop performs at most `max_revisions + 1` retrieve/draft/critique
/// cycles and stops early at the run deadline. It always yields an answer:
/// provider and index failures degrade, they are never returned.
#[derive(Debug, Clone)]
pub struct RagController {
    retriever: Retriever,
    reranker: Reranker,
    generator: AnswerGenerator,
    critic: Critic,
    reviser: QueryReviser,
    max_revisions: u32,
    top_k: usize,
    run_timeout: Duration,
}

impl RagController {
    pub fn new(
        retriever: Retriever,
        reranker: Reranker,
        generator: AnswerGenerator,
        critic: Critic,
        reviser: QueryReviser,
        config: &RagConfig,
    ) -> Self {
        Self {
            retriever,
            reranker,
            generator,
            critic,
            reviser,
            max_revisions: config.max_revisions,
            top_k: config.retrieval.top_k,
            run_timeout: Duration::from_secs(config.run_timeout_secs),
        }
    }

    /// Wire every stage from shared collaborators, one completion chain for
    /// drafting, critique and revision.
    pub fn from_parts(
        index: Arc<dyn VectorIndex>,
        embedder: ContextualEmbedder,
        rerank_provider: Option<Arc<dyn RerankProvider>>,
        chain: CompletionChain,
        config: &RagConfig,
    ) -> Self {
        let retriever = Retriever::new(index, embedder, config.retrieval.clone());
        let reranker = Reranker::new(rerank_provider).with_call_timeout(chain.call_timeout());
        let generator = AnswerGenerator::new(
            chain.clone(),
            config.draft,
            config.system_prompt.clone(),
            config.synthetic_citations,
        );
        let critic = Critic::new(chain.clone(), config.critique);
        let reviser = QueryReviser::new(chain, config.revision);

        Self::new(retriever, reranker, generator, critic, reviser, config)
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn with_reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn has_rerank_provider(&self) -> bool {
        self.reranker.has_provider()
    }

    pub fn max_revisions(&self) -> u32 {
        self.max_revisions
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        self.retriever.index()
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    #[instrument(skip_all, fields(query_chars = query.chars().count(), scoped = scope_filter.is_some()))]
    pub async fn run(&self, query: &str, scope_filter: Option<MetadataFilter>) -> RagAnswer {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.run_timeout;

        let mut state = PipelineState::new(query, scope_filter);
        let mut stage = Stage::Retrieve;
        let mut last_critiqued: Option<PipelineState> = None;
        let mut deadline_exceeded = false;

        while !stage.is_terminal() {
            debug!(
                stage = stage.as_str(),
                revision = state.revision_count,
                "Entering stage"
            );

            match tokio::time::timeout_at(deadline, self.step(stage, state.clone())).await {
                Ok((next_state, next_stage)) => {
                    if stage == Stage::Critique {
                        last_critiqued = Some(next_state.clone());
                    }
                    state = next_state;
                    stage = next_stage;
                }
                Err(_) => {
                    warn!(
                        stage = stage.as_str(),
                        revision = state.revision_count,
                        timeout_secs = self.run_timeout.as_secs_f64(),
                        "Run deadline reached, returning the latest draft"
                    );
                    deadline_exceeded = true;
                    break;
                }
            }
        }

        // A deadline inside a later cycle falls back to the last reviewed draft.
        if deadline_exceeded && state.draft_answer.is_empty() {
            if let Some(previous) = last_critiqued {
                state = previous;
            }
        }

        let outcome = if deadline_exceeded {
            "deadline"
        } else if state.generation_failed {
            "generation_failed"
        } else if state.critique_verdict == Some(CritiqueVerdict::Revise) {
            "forced_accept"
        } else {
            "accepted"
        };

        let answer = RagAnswer::from_state(state, deadline_exceeded);
        record_rag_run(outcome, answer.revision_count, start.elapsed());

        info!(
            outcome,
            revisions = answer.revision_count,
            citations = answer.citations.len(),
            retrieved = answer.retrieved_chunk_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Query answered"
        );

        answer
    }

    /// Execute one stage, returning the updated state and the next stage
    async fn step(&self, stage: Stage, mut state: PipelineState) -> (PipelineState, Stage) {
        match stage {
            Stage::Retrieve => {
                let candidates = match self
                    .retriever
                    .retrieve(&state.query, state.scope_filter.as_ref())
                    .await
                {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        error!(error = %e, "Retrieval failed, drafting without context");
                        Vec::new()
                    }
                };

                state.retrieved = self
                    .reranker
                    .rerank(&state.query, candidates, self.top_k)
                    .await;

                (state, Stage::Draft)
            }
            Stage::Draft => {
                let generated = self
                    .generator
                    .generate(&state.original_query, &state.retrieved)
                    .await;

                state.draft_answer = generated.answer_text;
                state.citations = generated.citations;
                state.generation_failed = generated.failed;

                // Nothing to critique when no provider could draft.
                let next = if state.generation_failed {
                    Stage::Accept
                } else {
                    Stage::Critique
                };
                (state, next)
            }
            Stage::Critique => {
                let critique = self
                    .critic
                    .critique(
                        &state.original_query,
                        &state.draft_answer,
                        &state.retrieved,
                        &state.citations,
                    )
                    .await;

                let next = after_critique(critique.verdict, state.revision_count, self.max_revisions);

                if critique.verdict == CritiqueVerdict::Revise && next == Stage::Accept {
                    info!(
                        revisions = state.revision_count,
                        "Revision budget exhausted, accepting current draft"
                    );
                }

                state.critique_verdict = Some(critique.verdict);
                state.critique = Some(critique.text);
                (state, next)
            }
            Stage::Revise => {
                let critique = state.critique.clone().unwrap_or_default();
                let rewritten = self.reviser.revise(&state.query, &critique).await;

                (state.revise(rewritten), Stage::Retrieve)
            }
            Stage::Accept => (state, Stage::Accept),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::{EmbeddingTask, MockEmbeddingProvider};
    use crate::domain::ingestion::{ChunkingConfig, DocumentInput};
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::rag::{LateChunkingConfig, GENERATION_FAILED_MARKER};
    use crate::infrastructure::index::InMemoryVectorIndex;
    use crate::infrastructure::ingestion::IngestionPipeline;

    struct Harness {
        index: Arc<InMemoryVectorIndex>,
        embedding: Arc<MockEmbeddingProvider>,
        drafter: Arc<MockLlmProvider>,
        critic: Arc<MockLlmProvider>,
        reviser: Arc<MockLlmProvider>,
    }

    impl Harness {
        fn new(drafter: MockLlmProvider, critic: MockLlmProvider, reviser: MockLlmProvider) -> Self {
            Self {
                index: Arc::new(InMemoryVectorIndex::new()),
                embedding: Arc::new(MockEmbeddingProvider::new("mock", 16)),
                drafter: Arc::new(drafter),
                critic: Arc::new(critic),
                reviser: Arc::new(reviser),
            }
        }

        fn embedder(&self) -> ContextualEmbedder {
            ContextualEmbedder::new(self.embedding.clone(), LateChunkingConfig::default())
        }

        async fn ingest(&self, input: DocumentInput) -> usize {
            IngestionPipeline::new(self.index.clone(), self.embedder(), ChunkingConfig::new(1000, 200))
                .ingest(input)
                .await
                .unwrap()
                .chunks_indexed
        }

        fn controller(&self, config: &RagConfig) -> RagController {
            let chain = |provider: &Arc<MockLlmProvider>| {
                CompletionChain::default().with_target(provider.clone(), vec!["m".into()])
            };

            RagController::new(
                Retriever::new(self.index.clone(), self.embedder(), config.retrieval.clone()),
                Reranker::distance_only(),
                AnswerGenerator::new(chain(&self.drafter), config.draft, "system", 3),
                Critic::new(chain(&self.critic), config.critique),
                QueryReviser::new(chain(&self.reviser), config.revision),
                config,
            )
        }
    }

    fn document(id: &str, scope: &str, len: usize) -> DocumentInput {
        let text: String = "Le délai de recours est de deux mois. "
            .chars()
            .cycle()
            .take(len)
            .collect();
        DocumentInput::new(id, text)
            .with_scope(scope)
            .with_page_number(1)
    }

    #[tokio::test]
    async fn test_always_revise_is_bounded() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter").with_text("Deux mois [Document doc-a, Page 1]."),
            MockLlmProvider::new("critic").with_text("REVISE: be more specific"),
            MockLlmProvider::new("reviser").with_text("délai recours contentieux"),
        );
        harness.ingest(document("doc-a", "case-1", 1500)).await;

        let config = RagConfig::default();
        let answer = harness.controller(&config).run("Quel délai ?", None).await;

        assert_eq!(answer.revision_count, 3);
        assert_eq!(harness.drafter.call_count(), 4);
        assert_eq!(harness.critic.call_count(), 4);
        assert_eq!(harness.reviser.call_count(), 3);
        assert_eq!(answer.final_query, "délai recours contentieux");
        assert!(!answer.deadline_exceeded);
        assert!(!answer.citations.is_empty());
    }

    #[tokio::test]
    async fn test_zero_revision_budget_accepts_first_draft() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter").with_text("Deux mois."),
            MockLlmProvider::new("critic").with_text("REVISE"),
            MockLlmProvider::new("reviser").with_text("unused"),
        );

        let config = RagConfig::default().with_max_revisions(0);
        let answer = harness.controller(&config).run("Quel délai ?", None).await;

        assert_eq!(answer.revision_count, 0);
        assert_eq!(harness.critic.call_count(), 1);
        assert_eq!(harness.reviser.call_count(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_scoped_query() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter")
                .with_text("Le délai est de deux mois [Document doc-a, Page 1, Section: Recours]."),
            MockLlmProvider::new("critic")
                .with_text("Well cited.\n{\"verdict\": \"accept\", \"issues\": []}"),
            MockLlmProvider::new("reviser").with_text("unused"),
        );
        assert_eq!(harness.ingest(document("doc-a", "case-1", 2500)).await, 3);
        harness.ingest(document("doc-b", "case-2", 2500)).await;

        let answer = harness
            .controller(&RagConfig::default())
            .run("Quel est le délai de recours ?", Some(MetadataFilter::scope("case-1")))
            .await;

        assert_eq!(answer.revision_count, 0);
        assert_eq!(answer.retrieved_chunk_count, 3);
        assert!(answer.retrieved_chunk_ids.iter().all(|id| id.starts_with("doc-a_chunk_")));
        assert!(!answer.citations.is_empty());
        assert!(answer.citations.iter().all(|c| c.document_id == "doc-a"));
        assert_eq!(harness.reviser.call_count(), 0);
    }

    #[tokio::test]
    async fn test_revised_query_drives_retrieval() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter").with_text("Deux mois [Document doc-a, Page 1]."),
            MockLlmProvider::new("critic").with_text_sequence(["REVISE: vague", "ACCEPT"]),
            MockLlmProvider::new("reviser").with_text("\"délai recours OQTF\""),
        );
        harness.ingest(document("doc-a", "case-1", 500)).await;

        let answer = harness.controller(&RagConfig::default()).run("Quel délai ?", None).await;

        assert_eq!(answer.revision_count, 1);
        assert_eq!(answer.final_query, "délai recours OQTF");

        let queries: Vec<String> = harness
            .embedding
            .seen_inputs()
            .into_iter()
            .filter(|(task, _)| *task == EmbeddingTask::Query)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(queries, vec!["Quel délai ?", "délai recours OQTF"]);

        // Drafting always answers the question as asked.
        let draft_request = harness.drafter.last_request().unwrap();
        assert!(draft_request.messages.iter().any(|m| m.content_text().contains("Quel délai ?")));
    }

    #[tokio::test]
    async fn test_generation_failure_skips_critique() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter").with_error("HTTP 503"),
            MockLlmProvider::new("critic").with_text("REVISE"),
            MockLlmProvider::new("reviser").with_text("unused"),
        );
        harness.ingest(document("doc-a", "case-1", 500)).await;

        let answer = harness.controller(&RagConfig::default()).run("Quel délai ?", None).await;

        assert!(answer.generation_failed);
        assert_eq!(answer.answer, GENERATION_FAILED_MARKER);
        assert!(answer.citations.is_empty());
        assert_eq!(answer.revision_count, 0);
        assert_eq!(harness.critic.call_count(), 0);
    }

    #[tokio::test]
    async fn test_citations_are_never_dropped() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter").with_text(
                "A [Document doc-a, Page 1]. B [Document doc-z, Page 9]. C [Document doc-a, Page 4].",
            ),
            MockLlmProvider::new("critic").with_text("ACCEPT"),
            MockLlmProvider::new("reviser").with_text("unused"),
        );
        harness.ingest(document("doc-a", "case-1", 500)).await;

        let answer = harness.controller(&RagConfig::default()).run("q", None).await;

        assert!(answer.citations.len() >= 3);
        assert!(answer.citations.iter().any(|c| c.document_id == "doc-z" && c.is_bare()));
    }

    #[tokio::test]
    async fn test_deadline_before_first_draft_returns_marker() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter")
                .with_text("late")
                .with_delay(Duration::from_secs(5)),
            MockLlmProvider::new("critic").with_text("ACCEPT"),
            MockLlmProvider::new("reviser").with_text("unused"),
        );

        let answer = harness
            .controller(&RagConfig::default())
            .with_run_timeout(Duration::from_millis(50))
            .run("q", None)
            .await;

        assert!(answer.deadline_exceeded);
        assert!(answer.generation_failed);
        assert_eq!(answer.answer, GENERATION_FAILED_MARKER);
    }

    #[tokio::test]
    async fn test_deadline_keeps_last_reviewed_draft() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter").with_text("Deux mois [Document doc-a, Page 1]."),
            MockLlmProvider::new("critic").with_text("REVISE"),
            MockLlmProvider::new("reviser")
                .with_text("slow rewrite")
                .with_delay(Duration::from_secs(5)),
        );
        harness.ingest(document("doc-a", "case-1", 500)).await;

        let answer = harness
            .controller(&RagConfig::default())
            .with_run_timeout(Duration::from_millis(300))
            .run("q", None)
            .await;

        assert!(answer.deadline_exceeded);
        assert!(!answer.generation_failed);
        assert_eq!(answer.answer, "Deux mois [Document doc-a, Page 1].");
        assert_eq!(answer.revision_count, 0);
        assert_eq!(answer.citations.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_still_answers() {
        let harness = Harness::new(
            MockLlmProvider::new("drafter").with_text("Aucune source disponible."),
            MockLlmProvider::new("critic").with_text("ACCEPT"),
            MockLlmProvider::new("reviser").with_text("unused"),
        );

        let answer = harness
            .controller(&RagConfig::default().with_top_k(3))
            .run("q", None)
            .await;

        assert_eq!(answer.retrieved_chunk_count, 0);
        assert!(answer.citations.is_empty());
        assert!(!answer.generation_failed);
    }

    #[test]
    fn test_from_parts_uses_config() {
        let config = RagConfig::default().with_max_revisions(1);
        let controller = RagController::from_parts(
            Arc::new(InMemoryVectorIndex::new()),
            ContextualEmbedder::new(
                Arc::new(MockEmbeddingProvider::new("mock", 4)),
                LateChunkingConfig::default(),
            ),
            None,
            CompletionChain::default(),
            &config,
        );

        assert_eq!(controller.max_revisions(), 1);
        assert_eq!(controller.run_timeout, Duration::from_secs(300));
    }
}
