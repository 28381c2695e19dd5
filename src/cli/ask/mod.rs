//! Ask command - ingests local files and answers one question in-process

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::ingestion::DocumentInput;
use crate::domain::rag::{Citation, RagAnswer};
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::services::{QueryRequest, RagServiceTrait};

/// Arguments for the ask command
#[derive(Args, Clone, Debug)]
pub struct AskArgs {
    /// Plain-text file to ingest (repeatable)
    #[arg(long = "doc", required = true)]
    pub docs: Vec<PathBuf>,

    /// Document id for the matching --doc, defaults to the file stem
    #[arg(long = "doc-id")]
    pub doc_ids: Vec<String>,

    /// Scope the documents are attached to and the question is asked in
    #[arg(long)]
    pub scope: String,

    /// Print the answer as JSON
    #[arg(long)]
    pub json: bool,

    /// The question to answer
    pub question: String,
}

#[derive(Debug, Serialize)]
struct AskOutput<'a> {
    answer: &'a str,
    citations: &'a [Citation],
    retrieved_chunk_count: usize,
    revision_count: u32,
    final_query: &'a str,
    generation_failed: bool,
    deadline_exceeded: bool,
}

impl<'a> From<&'a RagAnswer> for AskOutput<'a> {
    fn from(answer: &'a RagAnswer) -> Self {
        Self {
            answer: &answer.answer,
            citations: &answer.citations,
            retrieved_chunk_count: answer.retrieved_chunk_count,
            revision_count: answer.revision_count,
            final_query: &answer.final_query,
            generation_failed: answer.generation_failed,
            deadline_exceeded: answer.deadline_exceeded,
        }
    }
}

/// Run the ask command
pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging);

    let ids = document_ids(&args.docs, &args.doc_ids)?;
    let service = crate::build_rag_service(&config)?;

    for (path, document_id) in args.docs.iter().zip(ids) {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut input = DocumentInput::new(document_id, text).with_scope(&args.scope);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            input = input.with_filename(name);
        }

        let result = service.ingest(input).await?;
        info!(
            document_id = %result.document_id,
            chunks = result.chunks_indexed,
            fallbacks = result.embedding_fallbacks,
            "Document ingested"
        );
    }

    let outcome = service
        .query(QueryRequest::new(&args.question).with_scope(&args.scope))
        .await?;

    let rendered = if args.json {
        serde_json::to_string_pretty(&AskOutput::from(&outcome.answer))?
    } else {
        render_text(&outcome.answer)
    };
    println!("{}", rendered);

    Ok(())
}

/// Pair each file with an id: explicit ids by position, else the file stem
fn document_ids(docs: &[PathBuf], explicit: &[String]) -> anyhow::Result<Vec<String>> {
    if explicit.len() > docs.len() {
        bail!(
            "{} --doc-id values given for {} --doc files",
            explicit.len(),
            docs.len()
        );
    }

    docs.iter()
        .enumerate()
        .map(|(i, path)| match explicit.get(i) {
            Some(id) => Ok(id.clone()),
            None => file_stem(path),
        })
        .collect()
}

fn file_stem(path: &Path) -> anyhow::Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a document id from {}", path.display()))
}

fn render_text(answer: &RagAnswer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", answer.answer.trim_end());

    if !answer.citations.is_empty() {
        let _ = writeln!(out, "\nCitations:");
        for citation in &answer.citations {
            let _ = writeln!(out, "  - {}", format_citation(citation));
        }
    }

    let _ = write!(
        out,
        "\nRevisions: {} | Retrieved chunks: {}",
        answer.revision_count, answer.retrieved_chunk_count
    );
    if answer.deadline_exceeded {
        out.push_str(" | deadline exceeded");
    }

    out
}

fn format_citation(citation: &Citation) -> String {
    let mut text = format!("Document {}", citation.document_id);
    if let Some(page) = citation.page_number {
        let _ = write!(text, ", Page {}", page);
    }
    if let Some(section) = &citation.section_title {
        let _ = write!(text, ", Section: {}", section);
    }
    if let Some(clause) = &citation.clause_number {
        let _ = write!(text, ", Clause {}", clause);
    }
    text
}
