//! Rerank provider implementations

mod cohere;
mod factory;

pub use cohere::CohereRerankProvider;
pub use factory::{RerankProviderConfig, RerankProviderFactory};
