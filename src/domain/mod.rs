//! Domain layer - Core types, provider contracts and pure algorithms

pub mod embedding;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod llm;
pub mod rag;
pub mod rerank;

pub use embedding::{
    EmbeddingInput, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingTask,
};
pub use error::DomainError;
pub use index::{
    Chunk, FilterCondition, FilterConnector, FilterOperator, FilterValue, IndexedChunk,
    MetadataFilter, ReplaceResult, RetrievedCandidate, VectorIndex,
};
pub use ingestion::{
    clean_text, ChunkingConfig, ChunkingStrategy, DocumentInput, IngestionResult, TextSpan,
};
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole,
    Usage,
};
pub use rag::{
    Citation, CritiqueVerdict, GeneratedAnswer, PipelineState, QueryRecord,
    QueryRecordRepository, RagAnswer, RagConfig, RankedCandidate, Stage,
};
pub use rerank::{RerankProvider, RerankRequest, RerankResult};
