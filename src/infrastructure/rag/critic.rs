//! Draft critique and verdict classification

use serde::Deserialize;
use tracing::{debug, warn};

use super::prompts::critique_prompt;
use crate::domain::llm::LlmRequest;
use crate::domain::rag::{Citation, CompletionSettings, CritiqueVerdict, RankedCandidate};
use crate::infrastructure::llm::CompletionChain;

const DISAPPROVAL_KEYWORDS: &[&str] = &["REVISE", "ISSUE", "PROBLEM"];

/// Phrases that contain a keyword without disapproving
const NEGATED_PHRASES: &[&str] = &["NO ISSUES", "NO ISSUE", "NO PROBLEMS", "NO PROBLEM"];

/// A classified critique
#[derive(Debug, Clone, PartialEq)]
pub struct Critique {
    pub verdict: CritiqueVerdict,
    pub text: String,
    /// Issues listed in a structured verdict, if one was given
    pub issues: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredVerdict {
    verdict: String,
    #[serde(default)]
    issues: Vec<String>,
}

/// The last JSON object in the text that reads as a verdict.
///
/// Candidate objects end at the final `}` and start at each `{` from the
/// right, so braces earlier in the prose do not hide a trailing verdict.
fn extract_verdict(text: &str) -> Option<(&str, StructuredVerdict)> {
    let end = text.rfind('}')?;
    let head = &text[..end];

    head.match_indices('{').rev().find_map(|(start, _)| {
        let json = &text[start..=end];
        serde_json::from_str::<StructuredVerdict>(json)
            .ok()
            .map(|verdict| (json, verdict))
    })
}

/// Classify free-text critique.
///
/// A trailing `{"verdict": "accept"|"revise"}` object decides when present.
/// Otherwise the text (minus any JSON) is upper-cased and any disapproval
/// keyword outside a negated phrase means `Revise`.
pub fn classify_critique(text: &str) -> (CritiqueVerdict, Vec<String>) {
    let mut prose = text.to_string();

    if let Some((json, structured)) = extract_verdict(text) {
        match structured.verdict.trim().to_ascii_lowercase().as_str() {
            "accept" => return (CritiqueVerdict::Accept, structured.issues),
            "revise" => return (CritiqueVerdict::Revise, structured.issues),
            other => debug!(verdict = other, "Unrecognised structured verdict"),
        }
        prose = text.replacen(json, "", 1);
    }

    let mut upper = prose.to_uppercase();
    for phrase in NEGATED_PHRASES {
        upper = upper.replace(phrase, "");
    }

    let verdict = if DISAPPROVAL_KEYWORDS.iter().any(|k| upper.contains(k)) {
        CritiqueVerdict::Revise
    } else {
        CritiqueVerdict::Accept
    };

    (verdict, Vec::new())
}

#[derive(Debug, Clone)]
pub struct Critic {
    chain: CompletionChain,
    settings: CompletionSettings,
}

impl Critic {
    pub fn new(chain: CompletionChain, settings: CompletionSettings) -> Self {
        Self { chain, settings }
    }

    /// Judge `draft` against the original question and its context.
    ///
    /// If no provider answers, the draft is accepted: there is nothing to
    /// base a rewrite on.
    pub async fn critique(
        &self,
        original_query: &str,
        draft: &str,
        candidates: &[RankedCandidate],
        citations: &[Citation],
    ) -> Critique {
        let request = LlmRequest::builder()
            .user(critique_prompt(original_query, draft, candidates, citations))
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature)
            .build();

        match self.chain.complete(request).await {
            Ok(completion) => {
                let (verdict, issues) = classify_critique(&completion.text);
                debug!(
                    provider = completion.provider,
                    verdict = ?verdict,
                    issues = issues.len(),
                    "Draft critiqued"
                );
                Critique {
                    verdict,
                    text: completion.text,
                    issues,
                }
            }
            Err(e) => {
                warn!(error = %e, "Critique unavailable, accepting draft");
                Critique {
                    verdict: CritiqueVerdict::Accept,
                    text: String::new(),
                    issues: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::llm::MockLlmProvider;

    #[test]
    fn test_keyword_classification() {
        assert_eq!(classify_critique("ACCEPT").0, CritiqueVerdict::Accept);
        assert_eq!(
            classify_critique("REVISE: the second claim is unsupported").0,
            CritiqueVerdict::Revise
        );
        assert_eq!(
            classify_critique("There is a problem with page 3").0,
            CritiqueVerdict::Revise
        );
        assert_eq!(
            classify_critique("One issue: citation format").0,
            CritiqueVerdict::Revise
        );
    }

    #[test]
    fn test_negated_phrases_do_not_trigger_revision() {
        assert_eq!(
            classify_critique("The answer is well cited, no issues found. ACCEPT").0,
            CritiqueVerdict::Accept
        );
        assert_eq!(
            classify_critique("No problems detected.").0,
            CritiqueVerdict::Accept
        );
    }

    #[test]
    fn test_structured_verdict_wins() {
        let text = "Citations look fine.\n{\"verdict\": \"accept\", \"issues\": []}";
        assert_eq!(classify_critique(text).0, CritiqueVerdict::Accept);

        let text = "Looks ok overall.\n```json\n{\"verdict\": \"revise\", \"issues\": [\"missing page\"]}\n```";
        let (verdict, issues) = classify_critique(text);
        assert_eq!(verdict, CritiqueVerdict::Revise);
        assert_eq!(issues, vec!["missing page".to_string()]);
    }

    #[test]
    fn test_unknown_structured_verdict_falls_back_to_keywords() {
        let text = "ACCEPT {\"verdict\": \"maybe\", \"issues\": [\"x\"]}";
        assert_eq!(classify_critique(text).0, CritiqueVerdict::Accept);

        let text = "REVISE {\"verdict\": \"unsure\"}";
        assert_eq!(classify_critique(text).0, CritiqueVerdict::Revise);
    }

    #[test]
    fn test_braces_in_prose_do_not_hide_verdict() {
        let text = "One minor issue with the {placeholder} wording was already fixed.\n\
                    {\"verdict\": \"accept\", \"issues\": []}";
        assert_eq!(classify_critique(text).0, CritiqueVerdict::Accept);

        let text = "Context {a} and {b} look fine.\n\
                    {\"verdict\": \"revise\", \"issues\": [\"uncited {date}\"]}";
        let (verdict, issues) = classify_critique(text);
        assert_eq!(verdict, CritiqueVerdict::Revise);
        assert_eq!(issues, vec!["uncited {date}".to_string()]);
    }

    #[test]
    fn test_invalid_json_uses_keywords() {
        assert_eq!(
            classify_critique("REVISE {not json}").0,
            CritiqueVerdict::Revise
        );
    }

    #[tokio::test]
    async fn test_critic_uses_settings() {
        let provider = Arc::new(MockLlmProvider::new("groq").with_text("REVISE: add citations"));
        let chain = CompletionChain::default().with_target(provider.clone(), vec!["m".into()]);
        let critic = Critic::new(chain, CompletionSettings::new(500, 0.3));

        let critique = critic.critique("Quel délai ?", "Deux mois.", &[], &[]).await;

        assert_eq!(critique.verdict, CritiqueVerdict::Revise);
        assert_eq!(critique.text, "REVISE: add citations");

        let request = provider.last_request().unwrap();
        assert_eq!(request.max_tokens, Some(500));
        assert_eq!(request.temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_critic_failure_accepts() {
        let provider = Arc::new(MockLlmProvider::new("groq").with_error("down"));
        let chain = CompletionChain::default().with_target(provider, vec!["m".into()]);
        let critic = Critic::new(chain, CompletionSettings::new(500, 0.3));

        let critique = critic.critique("q", "draft", &[], &[]).await;
        assert!(critique.verdict.is_accept());
    }
}
