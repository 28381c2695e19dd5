//! Document ingestion infrastructure
//!
//! Chunking strategies and the pipeline that turns cleaned text into
//! context-embedded chunks in the vector index.

pub mod chunkers;
pub mod pipeline;

pub use chunkers::FixedSizeChunker;
pub use pipeline::IngestionPipeline;
