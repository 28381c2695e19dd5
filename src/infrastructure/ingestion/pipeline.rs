//! Ingestion pipeline: clean, chunk, embed with context, replace in the index

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::index::{Chunk, IndexedChunk, VectorIndex};
use crate::domain::ingestion::{
    clean_text, ChunkingConfig, ChunkingStrategy, DocumentInput, IngestionResult,
};
use crate::domain::DomainError;
use crate::infrastructure::embedding::ContextualEmbedder;
use crate::infrastructure::observability::record_ingestion;

use super::chunkers::FixedSizeChunker;

/// Ingestion pipeline writing documents into a vector index
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    index: Arc<dyn VectorIndex>,
    embedder: ContextualEmbedder,
    chunker: Arc<dyn ChunkingStrategy>,
    chunking: ChunkingConfig,
}

impl IngestionPipeline {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: ContextualEmbedder,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            chunker: Arc::new(FixedSizeChunker::new()),
            chunking,
        }
    }

    pub fn with_chunker(mut self, chunker: Arc<dyn ChunkingStrategy>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Ingest one document, replacing any chunks stored for it before
    #[instrument(skip(self, input), fields(document_id = %input.document_id))]
    pub async fn ingest(&self, input: DocumentInput) -> Result<IngestionResult, DomainError> {
        input.validate()?;
        self.chunking.validate()?;

        let text = clean_text(&input.text);
        let spans = self.chunker.chunk(&text, &self.chunking)?;

        let embeddings = self.embedder.embed_spans(&text, &spans).await;
        let fallbacks = embeddings.fallback_count();

        let chunks: Vec<IndexedChunk> = spans
            .into_iter()
            .zip(embeddings.into_vectors())
            .map(|(span, vector)| {
                let chunk = Chunk::new(&input.document_id, span.index, span.content)
                    .with_scopes(input.scope_ids.clone())
                    .with_page_number(input.page_number)
                    .with_section_title(input.section_title.clone())
                    .with_clause_number(input.clause_number.clone())
                    .with_filename(input.filename.clone());
                IndexedChunk::new(chunk, vector)
            })
            .collect();

        let replaced = self
            .index
            .replace_document(&input.document_id, chunks)
            .await?;

        record_ingestion(replaced.inserted, fallbacks);

        if fallbacks > 0 {
            warn!(
                chunks = replaced.inserted,
                fallbacks,
                chunker = self.chunker.name(),
                "Document indexed with degraded embeddings"
            );
        } else {
            info!(
                chunks = replaced.inserted,
                replaced = replaced.removed,
                chunker = self.chunker.name(),
                "Document indexed"
            );
        }

        Ok(IngestionResult {
            document_id: input.document_id,
            chunks_indexed: replaced.inserted,
            chunks_replaced: replaced.removed,
            embedding_fallbacks: fallbacks,
        })
    }

    /// Ingest several documents, stopping at the first error
    pub async fn ingest_batch(
        &self,
        inputs: Vec<DocumentInput>,
    ) -> Result<Vec<IngestionResult>, DomainError> {
        let mut results = Vec::with_capacity(inputs.len());

        for input in inputs {
            results.push(self.ingest(input).await?);
        }

        Ok(results)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<usize, DomainError> {
        self.index.delete_by_document(document_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::index::MetadataFilter;
    use crate::domain::rag::LateChunkingConfig;
    use crate::infrastructure::index::InMemoryVectorIndex;

    fn pipeline(provider: MockEmbeddingProvider) -> (IngestionPipeline, Arc<InMemoryVectorIndex>) {
        let index = Arc::new(InMemoryVectorIndex::new());
        let embedder = ContextualEmbedder::new(Arc::new(provider), LateChunkingConfig::default());
        (
            IngestionPipeline::new(index.clone(), embedder, ChunkingConfig::new(1000, 200)),
            index,
        )
    }

    fn text(len: usize) -> String {
        (0..len)
            .map(|i| if i % 7 == 6 { ' ' } else { char::from(b'a' + (i % 26) as u8) })
            .collect()
    }

    #[tokio::test]
    async fn test_ingest_2500_chars() {
        let (pipeline, index) = pipeline(MockEmbeddingProvider::new("mock", 8));

        let result = pipeline
            .ingest(DocumentInput::new("doc-1", text(2500)).with_scope("case-1"))
            .await
            .unwrap();

        assert_eq!(result.chunks_indexed, 3);
        assert_eq!(result.chunks_replaced, 0);
        assert!(!result.is_degraded());

        let stored = index
            .get_by_ids(&[
                "doc-1_chunk_0".to_string(),
                "doc-1_chunk_1".to_string(),
                "doc-1_chunk_2".to_string(),
            ])
            .await
            .unwrap();
        let lengths: Vec<usize> = stored.iter().map(|c| c.chunk.text.chars().count()).collect();
        assert_eq!(lengths, vec![1000, 1000, 900]);
        assert!(stored.iter().all(|c| c.chunk.belongs_to("case-1")));
    }

    #[tokio::test]
    async fn test_reingestion_replaces_chunks() {
        let (pipeline, index) = pipeline(MockEmbeddingProvider::new("mock", 8));

        pipeline
            .ingest(DocumentInput::new("doc-1", text(2500)).with_scope("case-1"))
            .await
            .unwrap();
        let second = pipeline
            .ingest(DocumentInput::new("doc-1", text(900)).with_scope("case-1"))
            .await
            .unwrap();

        assert_eq!(second.chunks_indexed, 1);
        assert_eq!(second.chunks_replaced, 3);
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_text_is_cleaned_before_chunking() {
        let (pipeline, index) = pipeline(MockEmbeddingProvider::new("mock", 4));

        pipeline
            .ingest(
                DocumentInput::new("doc-1", "  Article\u{200B}  L.\n\n 521-1 ")
                    .with_scope("case-1")
                    .with_page_number(2)
                    .with_section_title("Moyens"),
            )
            .await
            .unwrap();

        let stored = index
            .get_by_ids(&["doc-1_chunk_0".to_string()])
            .await
            .unwrap();
        assert_eq!(stored[0].chunk.text, "Article L. 521-1");
        assert_eq!(stored[0].chunk.page_number, Some(2));
        assert_eq!(stored[0].chunk.section_title.as_deref(), Some("Moyens"));
    }

    #[tokio::test]
    async fn test_empty_document_clears_previous_chunks() {
        let (pipeline, index) = pipeline(MockEmbeddingProvider::new("mock", 4));

        pipeline
            .ingest(DocumentInput::new("doc-1", text(1500)).with_scope("s"))
            .await
            .unwrap();
        let result = pipeline
            .ingest(DocumentInput::new("doc-1", "   ").with_scope("s"))
            .await
            .unwrap();

        assert_eq!(result.chunks_indexed, 0);
        assert_eq!(result.chunks_replaced, 2);
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_outage_still_indexes() {
        let (pipeline, index) = pipeline(MockEmbeddingProvider::new("mock", 4).with_error("down"));

        let result = pipeline
            .ingest(DocumentInput::new("doc-1", text(1200)).with_scope("s"))
            .await
            .unwrap();

        assert_eq!(result.chunks_indexed, 2);
        assert_eq!(result.embedding_fallbacks, 2);

        let hits = index
            .search(&[1.0, 0.0, 0.0, 0.0], 10, Some(&MetadataFilter::scope("s")))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected() {
        let (pipeline, _) = pipeline(MockEmbeddingProvider::new("mock", 4));

        let result = pipeline
            .ingest(DocumentInput::new("bad id", "text").with_scope("s"))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidId { .. })));
    }
}
