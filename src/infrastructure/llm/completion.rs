//! Ordered completion-provider chain with per-model fallback

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{info, warn};

use crate::domain::{DomainError, LlmProvider, LlmRequest, LlmResponse};
use crate::infrastructure::observability::{record_llm_request, LlmRequestMetricParams};

/// Default bound on a single provider call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// One provider and the models to try on it, in order
#[derive(Debug, Clone)]
pub struct CompletionTarget {
    provider: Arc<dyn LlmProvider>,
    models: Vec<String>,
}

impl CompletionTarget {
    pub fn new(provider: Arc<dyn LlmProvider>, models: Vec<String>) -> Self {
        Self { provider, models }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

/// Outcome of a single provider/model attempt
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub provider: &'static str,
    pub model: String,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Text produced by the first provider/model that answered
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub provider: &'static str,
    pub model: String,
    pub attempts: Vec<AttemptRecord>,
}

/// Tries providers strictly in order, and within a provider each model in
/// order. The first success wins; every attempt emits one structured event.
#[derive(Debug, Clone)]
pub struct CompletionChain {
    targets: Vec<CompletionTarget>,
    call_timeout: Duration,
}

impl Default for CompletionChain {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

impl CompletionChain {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            targets: Vec::new(),
            call_timeout,
        }
    }

    pub fn with_target(mut self, provider: Arc<dyn LlmProvider>, models: Vec<String>) -> Self {
        self.targets.push(CompletionTarget::new(provider, models));
        self
    }

    pub fn push(&mut self, target: CompletionTarget) {
        self.targets.push(target);
    }

    pub fn targets(&self) -> &[CompletionTarget] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.iter().all(|t| t.models.is_empty())
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Call one provider/model once, bounded by the per-call timeout
    pub async fn attempt(
        &self,
        provider: &dyn LlmProvider,
        model: &str,
        request: LlmRequest,
    ) -> Result<LlmResponse, DomainError> {
        match timeout(self.call_timeout, provider.chat(model, request)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::timeout(format!(
                "{} model '{}' did not answer within {}ms",
                provider.provider_name(),
                model,
                self.call_timeout.as_millis()
            ))),
        }
    }

    /// Run the request down the chain until a provider/model answers
    pub async fn complete(&self, request: LlmRequest) -> Result<Completion, DomainError> {
        if self.is_empty() {
            return Err(DomainError::configuration(
                "No completion providers configured",
            ));
        }

        let mut attempts = Vec::new();

        for target in &self.targets {
            let provider_name = target.provider_name();

            for model in &target.models {
                let start = Instant::now();
                let result = self
                    .attempt(target.provider.as_ref(), model, request.clone())
                    .await;
                let elapsed = start.elapsed();
                let latency_ms = elapsed.as_millis() as u64;

                match result {
                    Ok(response) => {
                        let usage = response.usage.clone();
                        record_llm_request(LlmRequestMetricParams {
                            provider: provider_name,
                            model,
                            duration: elapsed,
                            success: true,
                            input_tokens: usage.as_ref().map(|u| u.prompt_tokens as u64),
                            output_tokens: usage.as_ref().map(|u| u.completion_tokens as u64),
                        });
                        info!(
                            provider = provider_name,
                            model = %model,
                            outcome = "success",
                            latency_ms,
                            "Completion attempt"
                        );

                        attempts.push(AttemptRecord {
                            provider: provider_name,
                            model: model.clone(),
                            latency_ms,
                            error: None,
                        });

                        return Ok(Completion {
                            text: response.content().to_string(),
                            provider: provider_name,
                            model: model.clone(),
                            attempts,
                        });
                    }
                    Err(e) => {
                        record_llm_request(LlmRequestMetricParams {
                            provider: provider_name,
                            model,
                            duration: elapsed,
                            success: false,
                            input_tokens: None,
                            output_tokens: None,
                        });
                        warn!(
                            provider = provider_name,
                            model = %model,
                            outcome = "error",
                            latency_ms,
                            error = %e,
                            "Completion attempt failed, trying next"
                        );

                        attempts.push(AttemptRecord {
                            provider: provider_name,
                            model: model.clone(),
                            latency_ms,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }
        }

        let summary = attempts
            .iter()
            .map(|a| {
                format!(
                    "{}/{}: {}",
                    a.provider,
                    a.model,
                    a.error.as_deref().unwrap_or("ok")
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        Err(DomainError::provider(
            "completion_chain",
            format!("All {} attempts failed ({})", attempts.len(), summary),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    fn request() -> LlmRequest {
        LlmRequest::builder().user("Quel est le délai?").build()
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let groq = Arc::new(MockLlmProvider::new("groq").with_text("from groq"));
        let openai = Arc::new(MockLlmProvider::new("openai").with_text("from openai"));

        let chain = CompletionChain::default()
            .with_target(groq.clone(), vec!["llama-3.1-70b-versatile".into()])
            .with_target(openai.clone(), vec!["gpt-4-turbo-preview".into()]);

        let completion = chain.complete(request()).await.unwrap();

        assert_eq!(completion.text, "from groq");
        assert_eq!(completion.provider, "groq");
        assert_eq!(openai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let groq = Arc::new(MockLlmProvider::new("groq").with_error("HTTP 429: quota"));
        let openai = Arc::new(MockLlmProvider::new("openai").with_text("from openai"));

        let chain = CompletionChain::default()
            .with_target(groq.clone(), vec!["llama-3.1-70b-versatile".into()])
            .with_target(openai, vec!["gpt-4-turbo-preview".into()]);

        let completion = chain.complete(request()).await.unwrap();

        assert_eq!(completion.provider, "openai");
        assert_eq!(completion.model, "gpt-4-turbo-preview");
        assert_eq!(completion.attempts.len(), 2);
        assert!(!completion.attempts[0].succeeded());
    }

    #[tokio::test]
    async fn test_model_fallback_within_provider() {
        let provider = Arc::new(
            MockLlmProvider::new("groq")
                .with_text("ok")
                .failing_for_model("llama-3.1-70b-versatile"),
        );

        let chain = CompletionChain::default().with_target(
            provider.clone(),
            vec!["llama-3.1-70b-versatile".into(), "llama-3.1-8b-instant".into()],
        );

        let completion = chain.complete(request()).await.unwrap();

        assert_eq!(completion.model, "llama-3.1-8b-instant");
        assert_eq!(
            provider.requested_models(),
            vec!["llama-3.1-70b-versatile", "llama-3.1-8b-instant"]
        );
    }

    #[tokio::test]
    async fn test_all_fail() {
        let chain = CompletionChain::default()
            .with_target(Arc::new(MockLlmProvider::new("groq").with_error("down")), vec!["a".into()])
            .with_target(Arc::new(MockLlmProvider::new("openai").with_error("down")), vec!["b".into()]);

        let err = chain.complete(request()).await.unwrap_err();
        assert!(err.is_provider_failure());
        assert!(err.to_string().contains("groq/a"));
        assert!(err.to_string().contains("openai/b"));
    }

    #[tokio::test]
    async fn test_per_call_timeout() {
        let slow = Arc::new(
            MockLlmProvider::new("groq")
                .with_text("late")
                .with_delay(Duration::from_millis(200)),
        );
        let fast = Arc::new(MockLlmProvider::new("openai").with_text("fast"));

        let chain = CompletionChain::new(Duration::from_millis(20))
            .with_target(slow, vec!["m".into()])
            .with_target(fast, vec!["m".into()]);

        let completion = chain.complete(request()).await.unwrap();
        assert_eq!(completion.text, "fast");
        assert!(completion.attempts[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("Timed out")));
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain = CompletionChain::default();
        assert!(chain.is_empty());
        assert!(matches!(
            chain.complete(request()).await,
            Err(DomainError::Configuration { .. })
        ));
    }
}
