//! Query-time engine: retrieval, reranking, drafting, critique and the
//! bounded revision loop tying them together

mod controller;
mod critic;
mod generator;
mod prompts;
mod reranker;
mod retriever;
mod reviser;

pub use controller::RagController;
pub use critic::{classify_critique, Critic, Critique};
pub use generator::AnswerGenerator;
pub use prompts::{build_context, context_header};
pub use reranker::Reranker;
pub use retriever::Retriever;
pub use reviser::QueryReviser;
