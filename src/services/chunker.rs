//! Text chunking with overlap.
//!
//! Chunks are cut on an exact character-based sliding window so each chunk's
//! leading `overlap` characters equal the trailing characters of its
//! predecessor. Downstream context stitching relies on that being exact, so
//! there is no break-point adjustment here.

use crate::models::{Document, DocumentChunk, IngestionConfig};
use crate::utils::is_blank;

/// Splits documents into overlapping character-window chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Chunk size in characters
    chunk_size: usize,
    /// Overlap size in characters
    overlap: usize,
}

impl TextChunker {
    pub fn new(config: &IngestionConfig) -> Self {
        Self {
            chunk_size: config.chunk_size as usize,
            overlap: config.chunk_overlap as usize,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&IngestionConfig::default())
    }

    /// Chunk a document into overlapping segments.
    ///
    /// Whitespace-only windows are discarded; indices are assigned after
    /// filtering so surviving chunks stay densely numbered.
    pub fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        let content = &document.content;

        if is_blank(content) {
            return Vec::new();
        }

        let windows = self.split_with_overlap(content);
        let survivors: Vec<_> = windows
            .into_iter()
            .filter(|(text, _, _)| !is_blank(text))
            .collect();

        let total_chunks = survivors.len() as u32;

        survivors
            .into_iter()
            .enumerate()
            .map(|(idx, (text, start, end))| {
                DocumentChunk::from_document(document, text, idx as u32, total_chunks, start, end)
            })
            .collect()
    }

    /// Cut `content` into windows of `chunk_size` characters advancing by
    /// `chunk_size - overlap` per step. Returns (text, start, end) offsets
    /// in characters.
    fn split_with_overlap(&self, content: &str) -> Vec<(String, u64, u64)> {
        let chars: Vec<char> = content.chars().collect();
        let total_chars = chars.len();
        let mut windows = Vec::new();

        if total_chars == 0 {
            return windows;
        }

        if total_chars <= self.chunk_size {
            windows.push((content.to_string(), 0, total_chars as u64));
            return windows;
        }

        let step = if self.chunk_size > self.overlap {
            self.chunk_size - self.overlap
        } else {
            self.chunk_size
        };

        let mut start = 0;
        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let text: String = chars[start..end].iter().collect();
            windows.push((text, start as u64, end as u64));

            if end >= total_chars {
                break;
            }
            start += step;
        }

        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, DocumentMetadata, Source};

    fn test_document(content: &str) -> Document {
        Document::new(
            content.to_string(),
            ContentType::Text,
            Source::file("/test.txt"),
            DocumentMetadata::default(),
        )
    }

    fn chunker(size: u32, overlap: u32) -> TextChunker {
        TextChunker::new(&IngestionConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            ..Default::default()
        })
    }

    #[test]
    fn small_document_single_chunk() {
        let doc = test_document("Hello, world!");
        let chunks = TextChunker::with_defaults().chunk(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
    }

    #[test]
    fn empty_and_whitespace_documents_yield_nothing() {
        assert!(TextChunker::with_defaults().chunk(&test_document("")).is_empty());
        assert!(
            TextChunker::with_defaults()
                .chunk(&test_document("  \n\t \n "))
                .is_empty()
        );
    }

    #[test]
    fn three_thousand_chars_at_500_50_gives_seven_chunks() {
        // Window 500, step 450: starts at 0, 450, ..., 2700.
        let content: String = (0..3000)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let doc = test_document(&content);
        let chunks = chunker(500, 50).chunk(&doc);

        assert_eq!(chunks.len(), 7);
        for chunk in &chunks[..6] {
            assert_eq!(chunk.content.chars().count(), 500);
        }
        assert_eq!(chunks[6].content.chars().count(), 300);
    }

    #[test]
    fn consecutive_chunks_share_exact_overlap() {
        let content: String = (0..3000)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let doc = test_document(&content);
        let chunks = chunker(500, 50).chunk(&doc);

        for i in 1..chunks.len() {
            let prev: Vec<char> = chunks[i - 1].content.chars().collect();
            let head: String = chunks[i].content.chars().take(50).collect();
            let tail: String = prev[prev.len() - 50..].iter().collect();
            assert_eq!(head, tail, "chunk {} does not overlap its predecessor", i);
        }
    }

    #[test]
    fn offsets_track_window_positions() {
        let content = "x".repeat(1000);
        let doc = test_document(&content);
        let chunks = chunker(400, 100).chunk(&doc);

        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 400);
        assert_eq!(chunks[1].start_offset, 300);
        assert_eq!(chunks[1].end_offset, 700);
    }

    #[test]
    fn indices_are_dense() {
        let content = "y".repeat(2500);
        let doc = test_document(&content);
        let chunks = chunker(500, 50).chunk(&doc);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.total_chunks, chunks.len() as u32);
        }
    }
}
