//! Context-aware ("late chunking") chunk embedding

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::embedding::{blend, EmbeddingProvider, EmbeddingRequest, EmbeddingTask};
use crate::domain::ingestion::TextSpan;
use crate::domain::rag::LateChunkingConfig;
use crate::domain::DomainError;
use crate::infrastructure::llm::DEFAULT_CALL_TIMEOUT;
use crate::infrastructure::observability::record_embedding_fallback;

/// Where a chunk's stored vector came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSource {
    /// Local (window or chunk) embedding blended with the document embedding
    Blended,
    /// Local embedding only; the document embedding was unavailable
    LocalOnly,
    /// Document embedding only; the local embedding failed
    DocumentOnly,
    /// Nothing could be embedded
    Zero,
}

impl VectorSource {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Blended)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Blended => "blended",
            Self::LocalOnly => "local_only",
            Self::DocumentOnly => "document_only",
            Self::Zero => "zero",
        }
    }
}

/// Vector for one chunk
#[derive(Debug, Clone)]
pub struct ChunkVector {
    pub vector: Vec<f32>,
    pub source: VectorSource,
}

/// Vectors for every span of a document, in span order
#[derive(Debug, Clone, Default)]
pub struct ContextualEmbeddings {
    pub vectors: Vec<ChunkVector>,
}

impl ContextualEmbeddings {
    pub fn fallback_count(&self) -> usize {
        self.vectors.iter().filter(|v| v.source.is_degraded()).count()
    }

    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        self.vectors.into_iter().map(|v| v.vector).collect()
    }
}

/// Embeds chunks with surrounding document context.
///
/// The whole document is embedded once; each chunk is then embedded inside a
/// window of `window_radius` characters either side and blended with the
/// document vector as `alpha * window + (1 - alpha) * document`. Provider
/// errors never escape: each chunk degrades to whatever vector is available.
#[derive(Debug, Clone)]
pub struct ContextualEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    config: LateChunkingConfig,
    call_timeout: Duration,
}

impl ContextualEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: LateChunkingConfig) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            model,
            config,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Length of the zero vector used when nothing can be embedded
    pub fn fallback_dimensions(&self) -> usize {
        self.provider
            .dimensions(&self.model)
            .unwrap_or(self.config.fallback_dimensions)
    }

    async fn embed_one(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>, DomainError> {
        let request = EmbeddingRequest::single(&self.model, text).with_task(task);

        let response = match timeout(self.call_timeout, self.provider.embed(request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DomainError::timeout(format!(
                    "{} embedding did not answer within {}ms",
                    self.provider.provider_name(),
                    self.call_timeout.as_millis()
                )));
            }
        };

        response
            .into_first_vector()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                DomainError::provider(self.provider.provider_name(), "Empty embedding response")
            })
    }

    /// Embed a search query. Queries carry no document context.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        self.embed_one(query, EmbeddingTask::Query).await
    }

    /// Embed the document-level context vector, truncating silently
    async fn embed_document(&self, chars: &[char]) -> Option<Vec<f32>> {
        let limit = self.config.max_document_chars;
        let text: String = if chars.len() > limit {
            info!(
                document_chars = chars.len(),
                embedded_chars = limit,
                "Document truncated for document-level embedding"
            );
            chars[..limit].iter().collect()
        } else {
            chars.iter().collect()
        };

        match self.embed_one(&text, EmbeddingTask::Document).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Document-level embedding failed, chunk vectors will not be blended"
                );
                record_embedding_fallback("document");
                None
            }
        }
    }

    /// Embed every span of `document` with late chunking
    pub async fn embed_spans(&self, document: &str, spans: &[TextSpan]) -> ContextualEmbeddings {
        if spans.is_empty() {
            return ContextualEmbeddings::default();
        }

        let chars: Vec<char> = document.chars().collect();
        let document_vector = self.embed_document(&chars).await;

        let mut vectors = Vec::with_capacity(spans.len());
        for span in spans {
            let chunk_vector = self
                .embed_span(document, &chars, span, document_vector.as_deref())
                .await;

            if chunk_vector.source.is_degraded() {
                debug!(
                    chunk_index = span.index,
                    source = chunk_vector.source.as_str(),
                    "Chunk embedded in degraded mode"
                );
            }

            vectors.push(chunk_vector);
        }

        ContextualEmbeddings { vectors }
    }

    async fn embed_span(
        &self,
        document: &str,
        chars: &[char],
        span: &TextSpan,
        document_vector: Option<&[f32]>,
    ) -> ChunkVector {
        let local_text = match locate_span(document, chars, span) {
            Some((start, end)) => {
                let window_start = start.saturating_sub(self.config.window_radius);
                let window_end = (end + self.config.window_radius).min(chars.len());
                chars[window_start..window_end].iter().collect::<String>()
            }
            None => {
                debug!(
                    chunk_index = span.index,
                    "Chunk not found in document, embedding it without context"
                );
                span.content.clone()
            }
        };

        let local = match self.embed_one(&local_text, EmbeddingTask::Document).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(
                    provider = self.provider.provider_name(),
                    chunk_index = span.index,
                    error = %e,
                    "Chunk embedding failed"
                );
                None
            }
        };

        let chunk_vector = match (local, document_vector) {
            (Some(local), Some(doc)) => match blend(&local, doc, self.config.alpha) {
                Some(vector) => ChunkVector {
                    vector,
                    source: VectorSource::Blended,
                },
                None => ChunkVector {
                    vector: local,
                    source: VectorSource::LocalOnly,
                },
            },
            (Some(local), None) => ChunkVector {
                vector: local,
                source: VectorSource::LocalOnly,
            },
            (None, Some(doc)) => ChunkVector {
                vector: doc.to_vec(),
                source: VectorSource::DocumentOnly,
            },
            (None, None) => ChunkVector {
                vector: vec![0.0; self.fallback_dimensions()],
                source: VectorSource::Zero,
            },
        };

        match chunk_vector.source {
            VectorSource::DocumentOnly => record_embedding_fallback("document_only"),
            VectorSource::Zero => record_embedding_fallback("zero"),
            _ => {}
        }

        chunk_vector
    }
}

/// Character range of `span` inside the document.
///
/// The span's own offsets are trusted when they still point at its text;
/// otherwise the first occurrence of the text is used.
fn locate_span(document: &str, chars: &[char], span: &TextSpan) -> Option<(usize, usize)> {
    if span.content.is_empty() {
        return None;
    }

    if span.char_end <= chars.len() && span.char_start < span.char_end {
        let at_offsets = chars[span.char_start..span.char_end]
            .iter()
            .copied()
            .eq(span.content.chars());
        if at_offsets {
            return Some((span.char_start, span.char_end));
        }
    }

    let byte_start = document.find(&span.content)?;
    let start = document[..byte_start].chars().count();
    Some((start, start + span.content.chars().count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;

    fn config() -> LateChunkingConfig {
        LateChunkingConfig {
            window_radius: 5,
            ..LateChunkingConfig::default()
        }
    }

    fn span(index: usize, doc: &str, start: usize, end: usize) -> TextSpan {
        let content: String = doc.chars().skip(start).take(end - start).collect();
        TextSpan::new(index, content, start, end)
    }

    #[tokio::test]
    async fn test_blends_window_and_document() {
        let doc = "0123456789abcdefghijklmnopqrstuvwxyz";
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
        let embedder = ContextualEmbedder::new(provider.clone(), config());

        let result = embedder.embed_spans(doc, &[span(0, doc, 10, 20)]).await;

        let window = provider.vector_for("56789abcdefghijklmno");
        let document = provider.vector_for(doc);
        let expected = blend(&window, &document, 0.7).unwrap();

        assert_eq!(result.vectors[0].source, VectorSource::Blended);
        assert_eq!(result.vectors[0].vector, expected);
        assert_eq!(result.fallback_count(), 0);
    }

    #[tokio::test]
    async fn test_window_clamped_to_document_bounds() {
        let doc = "abcdefghij";
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 4));
        let embedder = ContextualEmbedder::new(provider.clone(), config());

        embedder.embed_spans(doc, &[span(0, doc, 0, 3)]).await;

        let inputs: Vec<String> = provider.seen_inputs().into_iter().map(|(_, t)| t).collect();
        assert_eq!(inputs, vec!["abcdefghij".to_string(), "abcdefgh".to_string()]);
    }

    #[tokio::test]
    async fn test_unlocatable_chunk_embedded_alone() {
        let doc = "the quick brown fox";
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 4));
        let embedder = ContextualEmbedder::new(provider.clone(), config());

        let drifted = TextSpan::new(0, "not in the text", 0, 15);
        let result = embedder.embed_spans(doc, &[drifted]).await;

        assert_eq!(result.vectors[0].source, VectorSource::Blended);
        assert!(provider
            .seen_inputs()
            .iter()
            .any(|(_, text)| text == "not in the text"));
    }

    #[test]
    fn test_stale_offsets_fall_back_to_search() {
        let doc = "aaaa TARGET bbbb";
        let stale = TextSpan::new(0, "TARGET", 0, 6);

        assert_eq!(locate_span(doc, &doc.chars().collect::<Vec<_>>(), &stale), Some((5, 11)));
    }

    #[tokio::test]
    async fn test_window_failure_uses_document_vector() {
        // the marker sits outside the document-level truncation limit
        let doc = "short context BOOM";
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 4).failing_on("BOOM"));
        let embedder = ContextualEmbedder::new(
            provider.clone(),
            LateChunkingConfig {
                max_document_chars: 5,
                window_radius: 0,
                ..LateChunkingConfig::default()
            },
        );

        let result = embedder.embed_spans(doc, &[span(0, doc, 14, 18)]).await;

        assert_eq!(result.vectors[0].source, VectorSource::DocumentOnly);
        assert_eq!(result.vectors[0].vector, provider.vector_for("short"));
        assert_eq!(result.fallback_count(), 1);
    }

    #[tokio::test]
    async fn test_total_failure_yields_zero_vector() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 16).with_error("down"));
        let embedder = ContextualEmbedder::new(provider, config());

        let doc = "some text";
        let result = embedder.embed_spans(doc, &[span(0, doc, 0, 4)]).await;

        assert_eq!(result.vectors[0].source, VectorSource::Zero);
        assert_eq!(result.vectors[0].vector, vec![0.0; 16]);
    }

    #[tokio::test]
    async fn test_document_failure_keeps_local_vector() {
        let doc = "FAILDOC rest of the document";
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 4).failing_on("FAILDOC"));
        let embedder = ContextualEmbedder::new(
            provider.clone(),
            LateChunkingConfig {
                window_radius: 0,
                ..LateChunkingConfig::default()
            },
        );

        let result = embedder.embed_spans(doc, &[span(0, doc, 8, 12)]).await;

        assert_eq!(result.vectors[0].source, VectorSource::LocalOnly);
        assert_eq!(result.vectors[0].vector, provider.vector_for("rest"));
    }

    #[tokio::test]
    async fn test_query_uses_query_task() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 4));
        let embedder = ContextualEmbedder::new(provider.clone(), config());

        let vector = embedder.embed_query("quel délai ?").await.unwrap();

        assert_eq!(vector, provider.vector_for("quel délai ?"));
        assert_eq!(provider.seen_inputs()[0].0, EmbeddingTask::Query);
    }

    #[tokio::test]
    async fn test_empty_spans_skip_provider() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 4));
        let embedder = ContextualEmbedder::new(provider.clone(), config());

        let result = embedder.embed_spans("text", &[]).await;

        assert!(result.vectors.is_empty());
        assert!(provider.seen_inputs().is_empty());
    }
}
