//! Response and report types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use unicode_segmentation::UnicodeSegmentation;

/// Answer returned when retrieval finds nothing to ground on
pub const NOT_FOUND_ANSWER: &str =
    "I couldn't find any relevant information in the uploaded documents to answer this question.";

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Store-assigned record id, when the backend returns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Chunk text
    pub content: String,
    /// Metadata stored with the chunk (at least `source` and `page`)
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Similarity to the query, higher is closer
    pub similarity: f32,
}

impl RetrievedChunk {
    /// Source identifier from metadata
    pub fn source(&self) -> Option<&str> {
        self.metadata
            .get("document")
            .or_else(|| self.metadata.get("source"))
            .and_then(Value::as_str)
    }

    /// Page number from metadata
    pub fn page(&self) -> Option<u64> {
        self.metadata.get("page").and_then(Value::as_u64)
    }
}

/// Ordered search results, highest similarity first
pub type RetrievalResult = Vec<RetrievedChunk>;

/// Source attribution for an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Excerpt of the chunk content
    pub content: String,
    /// Chunk metadata
    pub metadata: Map<String, Value>,
    /// Similarity to the question
    pub similarity: f32,
}

impl Source {
    /// Build a source from a retrieved chunk, keeping the first `excerpt_len` text units
    pub fn from_chunk(chunk: &RetrievedChunk, excerpt_len: usize) -> Self {
        Self {
            content: excerpt(&chunk.content, excerpt_len),
            metadata: chunk.metadata.clone(),
            similarity: chunk.similarity,
        }
    }
}

/// First `len` grapheme clusters of `text`, with `...` appended when truncated
pub fn excerpt(text: &str, len: usize) -> String {
    match text.grapheme_indices(true).nth(len) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Response from `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// Generated answer, or the failure message when synthesis degraded
    pub answer: String,
    /// Chunks the answer was grounded on
    pub sources: Vec<Source>,
    /// Whether an answer was produced
    pub success: bool,
    /// Failure message when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of chunks returned by retrieval
    pub retrieved_chunks: usize,
}

impl AnswerResponse {
    /// Response when retrieval returned nothing
    pub fn not_found() -> Self {
        Self {
            answer: NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
            success: true,
            error: None,
            retrieved_chunks: 0,
        }
    }

    /// Response carrying a failure message in place of an answer
    pub fn degraded(error: impl Into<String>, retrieved_chunks: usize) -> Self {
        let error = error.into();
        Self {
            answer: format!("I apologize, but I encountered an error: {}", error),
            sources: Vec::new(),
            success: false,
            error: Some(error),
            retrieved_chunks,
        }
    }
}

/// Step of the ingestion pipeline at which a chunk failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Embedding call failed
    Embedding,
    /// Vector store write failed
    Store,
}

/// A chunk that could not be stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFailure {
    /// Index of the chunk within its document
    pub chunk_index: usize,
    /// Page the chunk came from
    pub page: u32,
    /// Failing step
    pub stage: FailureStage,
    /// Error message
    pub reason: String,
}

/// Outcome of ingesting one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Document source
    pub source: String,
    /// Chunks produced by the chunker
    pub attempted: usize,
    /// Chunks written to the vector store
    pub stored: usize,
    /// Per-chunk failures, ordered by chunk index
    pub failed: Vec<ChunkFailure>,
}

impl IngestionReport {
    /// Empty report for a source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            attempted: 0,
            stored: 0,
            failed: Vec::new(),
        }
    }

    /// Whether every attempted chunk was stored
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether chunks were attempted and none were stored
    pub fn is_total_failure(&self) -> bool {
        self.attempted > 0 && self.stored == 0
    }
}

/// A document that could not be ingested at all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// Document source
    pub source: String,
    /// Error message
    pub reason: String,
}

/// Outcome of ingesting a directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Reports for documents that were parsed and chunked
    pub documents: Vec<IngestionReport>,
    /// Documents that failed before chunking
    pub failed_documents: Vec<DocumentFailure>,
}

impl BatchReport {
    /// Total chunks stored across documents
    pub fn stored(&self) -> usize {
        self.documents.iter().map(|d| d.stored).sum()
    }

    /// Total chunks that failed across documents
    pub fn failed_chunks(&self) -> usize {
        self.documents.iter().map(|d| d.failed.len()).sum()
    }
}

/// Response from `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human-readable outcome
    pub message: String,
    /// Ingestion report
    pub report: IngestionReport,
}
