//! Infrastructure layer - Provider adapters, index, ingestion and the query engine

pub mod embedding;
pub mod index;
pub mod ingestion;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod rag;
pub mod rerank;
pub mod services;
