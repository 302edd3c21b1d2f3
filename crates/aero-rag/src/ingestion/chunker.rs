//! Fixed-size overlapping text chunking with page and position tracking

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{ChunkMetadata, DocumentChunk, Page, SourceDocument};

/// Splits pages into windows of at most `chunk_size` grapheme clusters.
///
/// Consecutive windows from the same page share exactly `overlap` units; the
/// last window of a page ends at the page end. Chunks never span pages.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk length in text units
    chunk_size: usize,
    /// Overlap between consecutive chunks of a page
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. Fails when `chunk_size` is 0 or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
        }
        .validate()?;

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunk every page of a document. Chunk indices run from 0 across the document.
    pub fn chunk_document(&self, doc: &SourceDocument) -> Vec<DocumentChunk> {
        let document = doc.name().to_string();
        let mut chunks = Vec::new();

        for page in &doc.pages {
            self.chunk_page(page, &doc.source, &document, &mut chunks);
        }

        tracing::debug!(
            "Chunked '{}': {} pages -> {} chunks",
            doc.source,
            doc.pages.len(),
            chunks.len()
        );

        chunks
    }

    fn chunk_page(
        &self,
        page: &Page,
        source: &str,
        document: &str,
        chunks: &mut Vec<DocumentChunk>,
    ) {
        if page.text.trim().is_empty() {
            return;
        }

        // Byte offset of every grapheme, plus the end of the text
        let mut bounds: Vec<usize> = page.text.grapheme_indices(true).map(|(i, _)| i).collect();
        let units = bounds.len();
        bounds.push(page.text.len());

        let step = self.chunk_size - self.overlap;
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(units);

            chunks.push(DocumentChunk {
                content: page.text[bounds[start]..bounds[end]].to_string(),
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    document: document.to_string(),
                    page: page.number,
                    chunk_index: chunks.len(),
                    char_start: start,
                    char_end: end,
                },
            });

            if end == units {
                break;
            }
            start += step;
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use proptest::prelude::*;

    fn units(text: &str) -> usize {
        text.graphemes(true).count()
    }

    #[test]
    fn test_two_page_scenario() {
        let doc = SourceDocument::from_texts("manual.pdf", ["a".repeat(1500), "b".repeat(100)]);
        let chunks = TextChunker::new(1000, 200).unwrap().chunk_document(&doc);

        let spans: Vec<_> = chunks
            .iter()
            .map(|c| {
                (
                    c.metadata.page,
                    c.metadata.char_start,
                    c.metadata.char_end,
                    c.metadata.chunk_index,
                )
            })
            .collect();
        assert_eq!(spans, vec![(1, 0, 1000, 0), (1, 800, 1500, 1), (2, 0, 100, 2)]);
        assert_eq!(chunks[2].content, "b".repeat(100));
    }

    #[test]
    fn test_page_shorter_than_overlap_is_one_chunk() {
        let doc = SourceDocument::from_texts("a.pdf", ["Check hydraulic pressure."]);
        let chunks = TextChunker::new(1000, 200).unwrap().chunk_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Check hydraulic pressure.");
    }

    #[test]
    fn test_blank_pages_are_skipped() {
        let doc = SourceDocument::from_texts("a.pdf", ["", "   \n\t", "text"]);
        let chunks = TextChunker::default().chunk_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.page, 3);
        assert_eq!(chunks[0].metadata.chunk_index, 0);
    }

    #[test]
    fn test_graphemes_are_not_split() {
        // "é" as e + combining acute accent is one unit
        let text = "e\u{301}".repeat(5);
        let doc = SourceDocument::from_texts("a.txt", [text]);
        let chunks = TextChunker::new(2, 1).unwrap().chunk_document(&doc);
        assert!(chunks.iter().all(|c| units(&c.content) <= 2));
        assert!(chunks.iter().all(|c| c.content.starts_with('e')));
    }

    #[test]
    fn test_metadata_carries_document_name() {
        let doc = SourceDocument::from_texts("/srv/manuals/apu.pdf", ["text"]);
        let chunks = TextChunker::default().chunk_document(&doc);
        assert_eq!(chunks[0].metadata.source, "/srv/manuals/apu.pdf");
        assert_eq!(chunks[0].metadata.document, "apu.pdf");
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(TextChunker::new(0, 0), Err(Error::Config(_))));
        assert!(matches!(TextChunker::new(100, 100), Err(Error::Config(_))));
        assert!(matches!(TextChunker::new(100, 150), Err(Error::Config(_))));
        assert!(TextChunker::new(100, 99).is_ok());
    }

    fn pages_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-zA-Z0-9 .\n]{0,600}", 1..5)
    }

    fn params_strategy() -> impl Strategy<Value = (usize, usize)> {
        (1usize..120).prop_flat_map(|size| (Just(size), 0..size))
    }

    proptest! {
        #[test]
        fn proptest_chunks_respect_size_and_overlap(
            pages in pages_strategy(),
            (size, overlap) in params_strategy(),
        ) {
            let doc = SourceDocument::from_texts("doc.pdf", pages.clone());
            let chunks = TextChunker::new(size, overlap).unwrap().chunk_document(&doc);

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.metadata.chunk_index, i);
                prop_assert!(units(&chunk.content) <= size);
                prop_assert_eq!(units(&chunk.content), chunk.len());
            }

            for pair in chunks.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                if prev.metadata.page == next.metadata.page {
                    prop_assert_eq!(prev.metadata.char_end - next.metadata.char_start, overlap);
                    let tail: String = prev.content.graphemes(true).skip(size - overlap).collect();
                    let head: String = next.content.graphemes(true).take(overlap).collect();
                    prop_assert_eq!(tail, head);
                }
            }

            // Every non-blank page is covered to its end
            for (i, text) in pages.iter().enumerate() {
                let page_no = i as u32 + 1;
                let last = chunks.iter().filter(|c| c.metadata.page == page_no).last();
                match last {
                    Some(chunk) => prop_assert_eq!(chunk.metadata.char_end, units(text)),
                    None => prop_assert!(text.trim().is_empty()),
                }
            }
        }

        #[test]
        fn proptest_chunking_is_deterministic(
            pages in pages_strategy(),
            (size, overlap) in params_strategy(),
        ) {
            let doc = SourceDocument::from_texts("doc.pdf", pages);
            let chunker = TextChunker::new(size, overlap).unwrap();
            prop_assert_eq!(chunker.chunk_document(&doc), chunker.chunk_document(&doc));
        }
    }
}
