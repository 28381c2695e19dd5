//! Embedding provider implementations and the late-chunking embedder

mod contextual;
mod factory;
mod nomic;
mod openai;

pub use contextual::{ChunkVector, ContextualEmbedder, ContextualEmbeddings, VectorSource};
pub use factory::{EmbeddingProviderConfig, EmbeddingProviderFactory, EmbeddingProviderKind};
pub use nomic::NomicEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

// Re-export HTTP client for use by embedding providers
pub use super::llm::{HttpClient, HttpClientTrait};
