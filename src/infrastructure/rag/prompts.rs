//! Prompt templates for drafting, critique and query revision

use crate::domain::rag::{Citation, RankedCandidate};

/// Context header for one candidate, in the same bracket notation answers
/// must cite with
pub fn context_header(candidate: &RankedCandidate) -> String {
    let chunk = candidate.chunk();
    let page = chunk
        .page_number
        .map(|p| p.to_string())
        .unwrap_or_else(|| "?".to_string());

    match chunk.section_title.as_deref() {
        Some(section) => format!(
            "[Document {}, Page {}, Section: {}]",
            chunk.source_document_id, page, section
        ),
        None => format!("[Document {}, Page {}]", chunk.source_document_id, page),
    }
}

/// One line per candidate: header followed by the chunk text
pub fn build_context(candidates: &[RankedCandidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("{} {}", context_header(c), c.chunk().text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn draft_prompt(query: &str, candidates: &[RankedCandidate]) -> String {
    let context = if candidates.is_empty() {
        "(no matching documents were found)".to_string()
    } else {
        build_context(candidates)
    };

    format!(
        r#"Context from documents:
{context}

Query: {query}

IMPORTANT: You MUST cite every fact or claim you make, using exactly the bracket notation of the context headers: [Document <id>, Page <n>, Section: <title>].

Example: "According to the notification letter [Document doc-123, Page 2, Section: Decision], the client..."

Provide a comprehensive answer based only on the context. If the context does not contain the answer, say so."#
    )
}

pub fn critique_prompt(
    original_query: &str,
    draft: &str,
    candidates: &[RankedCandidate],
    citations: &[Citation],
) -> String {
    format!(
        r#"You are a legal expert reviewing an AI-generated answer.

Original Query: {original_query}

Retrieved Context:
{context}

Draft Answer:
{draft}

Citations Found: {citation_count}

Please critique this answer. Check:
1. Does the answer cite sources properly, in the [Document ID, Page Number] format?
2. Are there any conflicts or contradictions between different sources?
3. Is the answer accurate and complete?
4. Does it make claims the context does not support?

Provide your critique. If the answer is good, say "ACCEPT". If there are issues, say "REVISE" and explain why.
End your reply with a JSON object on its own line: {{"verdict": "accept" or "revise", "issues": ["..."]}}"#,
        context = build_context(candidates),
        citation_count = citations.len(),
    )
}

pub fn revision_prompt(query: &str, critique: &str) -> String {
    format!(
        r#"Based on this critique, refine the search query to get better results:

Original Query: {query}
Critique: {critique}

Reply with only the refined, more specific search query that addresses the issues mentioned."#
    )
}
