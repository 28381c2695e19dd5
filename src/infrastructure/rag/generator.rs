//! Cited answer generation over reranked context

use tracing::{debug, info, warn};

use super::prompts::draft_prompt;
use crate::domain::llm::LlmRequest;
use crate::domain::rag::{
    extract_citations, synthesize_citations, CompletionSettings, GeneratedAnswer, RankedCandidate,
};
use crate::infrastructure::llm::CompletionChain;

#[derive(Debug, Clone)]
pub struct AnswerGenerator {
    chain: CompletionChain,
    settings: CompletionSettings,
    system_prompt: String,
    synthetic_citations: usize,
}

impl AnswerGenerator {
    pub fn new(
        chain: CompletionChain,
        settings: CompletionSettings,
        system_prompt: impl Into<String>,
        synthetic_citations: usize,
    ) -> Self {
        Self {
            chain,
            settings,
            system_prompt: system_prompt.into(),
            synthetic_citations,
        }
    }

    pub fn chain(&self) -> &CompletionChain {
        &self.chain
    }

    /// Draft an answer citing `candidates`.
    ///
    /// Never fails: when the whole provider chain fails the failure marker is
    /// returned with no citations.
    pub async fn generate(&self, query: &str, candidates: &[RankedCandidate]) -> GeneratedAnswer {
        let request = LlmRequest::builder()
            .system(self.system_prompt.clone())
            .user(draft_prompt(query, candidates))
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature)
            .build();

        let completion = match self.chain.complete(request).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(error = %e, "Every completion provider failed while drafting");
                return GeneratedAnswer::failure();
            }
        };

        let answer_text = completion.text.trim().to_string();
        if answer_text.is_empty() {
            warn!(
                provider = completion.provider,
                model = %completion.model,
                "Completion provider returned an empty draft"
            );
            return GeneratedAnswer::failure();
        }

        let mut citations = extract_citations(&answer_text, candidates);

        if citations.is_empty() && !candidates.is_empty() {
            info!(
                synthetic = self.synthetic_citations.min(candidates.len()),
                "Draft has no parsable citations, citing top candidates"
            );
            citations = synthesize_citations(candidates, self.synthetic_citations);
        }

        debug!(
            provider = completion.provider,
            model = %completion.model,
            citations = citations.len(),
            "Draft generated"
        );

        GeneratedAnswer::new(answer_text, citations)
    }
}
