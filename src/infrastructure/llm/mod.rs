//! Completion provider implementations and the provider chain

mod anthropic;
mod completion;
mod factory;
mod http_client;
mod openai;

pub use anthropic::AnthropicProvider;
pub use completion::{
    AttemptRecord, Completion, CompletionChain, CompletionTarget, DEFAULT_CALL_TIMEOUT,
};
pub use factory::{resolve_api_key, CompletionProviderKind, LlmProviderConfig, LlmProviderFactory};
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::{OpenAiProvider, DEFAULT_GROQ_BASE_URL, DEFAULT_OPENAI_BASE_URL};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
