//! Search query rewriting from a critique

use tracing::{debug, warn};

use super::prompts::revision_prompt;
use crate::domain::llm::LlmRequest;
use crate::domain::rag::CompletionSettings;
use crate::infrastructure::llm::CompletionChain;

#[derive(Debug, Clone)]
pub struct QueryReviser {
    chain: CompletionChain,
    settings: CompletionSettings,
}

impl QueryReviser {
    pub fn new(chain: CompletionChain, settings: CompletionSettings) -> Self {
        Self { chain, settings }
    }

    /// Rewritten search query, or `None` if no usable rewrite came back
    pub async fn revise(&self, query: &str, critique: &str) -> Option<String> {
        let request = LlmRequest::builder()
            .user(revision_prompt(query, critique))
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature)
            .build();

        match self.chain.complete(request).await {
            Ok(completion) => {
                let rewritten = normalize_rewrite(&completion.text);
                debug!(rewritten = ?rewritten, "Query revised");
                rewritten
            }
            Err(e) => {
                warn!(error = %e, "Query revision failed, keeping current query");
                None
            }
        }
    }
}

/// Trim whitespace and wrapping quotes; empty output is no rewrite
fn normalize_rewrite(text: &str) -> Option<String> {
    let trimmed = text
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();

    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
