//! Vector index domain - chunk storage and filtered similarity search

mod chunk;
mod filter;
mod provider;

pub use chunk::{
    chunk_id, Chunk, IndexedChunk, RetrievedCandidate, META_DOCUMENT_ID, META_SCOPE_IDS,
};
pub use filter::{FilterCondition, FilterConnector, FilterOperator, FilterValue, MetadataFilter};
pub use provider::{ReplaceResult, VectorIndex};
