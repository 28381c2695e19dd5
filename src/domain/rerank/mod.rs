//! Cross-encoder reranking provider contract

mod provider;

pub use provider::{RerankProvider, RerankRequest, RerankResult};

#[cfg(test)]
pub use provider::mock::MockRerankProvider;
