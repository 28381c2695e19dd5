//! Fixed-size chunking strategy

use crate::domain::ingestion::{ChunkingConfig, ChunkingStrategy, TextSpan};
use crate::domain::DomainError;

/// Splits text into windows of `chunk_size` characters where consecutive
/// windows share `chunk_overlap` characters. The last window ends at the end
/// of the text and may be shorter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSizeChunker;

impl FixedSizeChunker {
    pub fn new() -> Self {
        Self
    }
}

impl ChunkingStrategy for FixedSizeChunker {
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Result<Vec<TextSpan>, DomainError> {
        config.validate()?;

        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Ok(vec![]);
        }

        let mut spans = Vec::with_capacity(chars.len() / config.step() + 1);
        let mut start = 0;

        loop {
            let end = (start + config.chunk_size).min(chars.len());
            let content: String = chars[start..end].iter().collect();
            spans.push(TextSpan::new(spans.len(), content, start, end));

            if end == chars.len() {
                break;
            }

            start = end - config.chunk_overlap;
        }

        Ok(spans)
    }

    fn name(&self) -> &'static str {
        "fixed_size"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content() {
        let chunks = FixedSizeChunker::new()
            .chunk("", &ChunkingConfig::default())
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = FixedSizeChunker::new()
            .chunk("Hello, World!", &ChunkingConfig::new(1000, 200))
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, World!");
        assert_eq!((chunks[0].char_start, chunks[0].char_end), (0, 13));
    }

    #[test]
    fn test_exact_size_is_single_chunk() {
        let text = "x".repeat(1000);
        let chunks = FixedSizeChunker::new()
            .chunk(&text, &ChunkingConfig::default())
            .unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_2500_chars_yield_three_chunks() {
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = FixedSizeChunker::new()
            .chunk(&text, &ChunkingConfig::new(1000, 200))
            .unwrap();

        let bounds: Vec<(usize, usize)> =
            chunks.iter().map(|c| (c.char_start, c.char_end)).collect();
        assert_eq!(bounds, vec![(0, 1000), (800, 1800), (1600, 2500)]);

        let lengths: Vec<usize> = chunks.iter().map(|c| c.content.chars().count()).collect();
        assert_eq!(lengths, vec![1000, 1000, 900]);
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let text: String = (0..3000).map(|i| char::from(b'a' + (i % 23) as u8)).collect();
        let chunks = FixedSizeChunker::new()
            .chunk(&text, &ChunkingConfig::new(1000, 200))
            .unwrap();

        for pair in chunks.windows(2) {
            let tail: String = pair[0].content.chars().skip(800).collect();
            let head: String = pair[1].content.chars().take(200).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "é".repeat(15);
        let chunks = FixedSizeChunker::new()
            .chunk(&text, &ChunkingConfig::new(10, 2))
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content.chars().count(), 10);
        assert_eq!(chunks[1].content, "é".repeat(7));
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn test_deterministic() {
        let text = "Le tribunal administratif annule la décision. ".repeat(40);
        let config = ChunkingConfig::new(120, 30);
        let chunker = FixedSizeChunker::new();

        assert_eq!(
            chunker.chunk(&text, &config).unwrap(),
            chunker.chunk(&text, &config).unwrap()
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(FixedSizeChunker::new()
            .chunk("text", &ChunkingConfig::new(10, 10))
            .is_err());
    }
}
