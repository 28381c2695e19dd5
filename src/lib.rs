//! citerag - Citation-grounded retrieval-augmented generation
//!
//! Documents are chunked, embedded with surrounding context and stored in a
//! vector index. Questions go through a bounded loop of retrieval, reranking,
//! cited drafting and automated critique, with every provider call degrading
//! instead of failing.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::{info, warn};

use api::state::AppState;
use domain::rag::InMemoryQueryRecordRepository;
use infrastructure::embedding::{ContextualEmbedder, EmbeddingProviderFactory};
use infrastructure::index::InMemoryVectorIndex;
use infrastructure::ingestion::IngestionPipeline;
use infrastructure::llm::{HttpClient, LlmProviderFactory};
use infrastructure::rag::{RagController, Reranker};
use infrastructure::rerank::RerankProviderFactory;
use infrastructure::services::RagService;

/// Wire the engine from configuration over a fresh in-memory index
pub fn build_rag_service(config: &AppConfig) -> anyhow::Result<RagService> {
    config.rag.validate()?;

    let call_timeout = config.providers.request_timeout();
    let http_client = HttpClient::with_timeout(call_timeout)?;

    let chain = LlmProviderFactory::build_chain(&config.providers.completion, call_timeout);
    if chain.is_empty() {
        warn!("No completion provider is available, every answer will report a generation failure");
    }

    let embedding_provider =
        EmbeddingProviderFactory::create(&config.providers.embedding, http_client.clone())?;
    let mut embedder = ContextualEmbedder::new(embedding_provider, config.rag.late_chunking.clone())
        .with_call_timeout(call_timeout);
    if let Some(model) = &config.providers.embedding.model {
        embedder = embedder.with_model(model.clone());
    }

    let rerank_provider = match RerankProviderFactory::create(&config.providers.rerank, http_client) {
        Ok(provider) => provider,
        Err(e) => {
            warn!(error = %e, "Rerank provider unavailable, ranking by vector distance");
            None
        }
    };

    let index = Arc::new(InMemoryVectorIndex::new());
    let pipeline = IngestionPipeline::new(index.clone(), embedder.clone(), config.rag.chunking);

    let mut controller = RagController::from_parts(
        index,
        embedder.clone(),
        rerank_provider.clone(),
        chain,
        &config.rag,
    );
    if let Some(model) = &config.providers.rerank.model {
        controller = controller.with_reranker(
            Reranker::new(rerank_provider)
                .with_model(model.clone())
                .with_call_timeout(call_timeout),
        );
    }

    info!(
        embedding = embedder.provider_name(),
        embedding_model = embedder.model(),
        reranking = controller.has_rerank_provider(),
        max_revisions = controller.max_revisions(),
        "RAG engine ready"
    );

    Ok(RagService::new(
        pipeline,
        controller,
        Arc::new(InMemoryQueryRecordRepository::new()),
    ))
}

/// Create the application state with custom configuration
pub fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    Ok(AppState::new(Arc::new(build_rag_service(config)?)))
}
