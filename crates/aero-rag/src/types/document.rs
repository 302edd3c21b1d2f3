//! Document, page and chunk types with source tracking

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name or path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// One page of extracted text. Page numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    /// Page text
    pub text: String,
}

impl Page {
    /// Create a page
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A document ready for chunking: a source identifier and its ordered pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Where the document came from (path or upload file name)
    pub source: String,
    /// Pages in reading order
    pub pages: Vec<Page>,
}

impl SourceDocument {
    /// Create a document from pages
    pub fn new(source: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            source: source.into(),
            pages,
        }
    }

    /// Create a document from page texts numbered 1..=n
    pub fn from_texts<I, S>(source: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page::new(i as u32 + 1, text))
            .collect();
        Self::new(source, pages)
    }

    /// File name without directories
    pub fn name(&self) -> &str {
        Path::new(&self.source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.source)
    }
}

/// Metadata stored alongside every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source path or upload name
    pub source: String,
    /// File name without directories
    pub document: String,
    /// 1-based page number
    pub page: u32,
    /// Position of the chunk within its document, from 0
    pub chunk_index: usize,
    /// First text unit of the chunk within its page
    pub char_start: usize,
    /// One past the last text unit of the chunk within its page
    pub char_end: usize,
}

impl ChunkMetadata {
    /// Metadata as a JSON object, the shape persisted by vector stores
    pub fn to_json(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A bounded slice of a document's text. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk text
    pub content: String,
    /// Source tracking
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    /// Length in text units
    pub fn len(&self) -> usize {
        self.metadata.char_end - self.metadata.char_start
    }

    /// Whether the chunk has no text
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A chunk together with its embedding
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    /// The chunk
    pub chunk: DocumentChunk,
    /// Embedding vector
    pub embedding: Vec<f32>,
}
