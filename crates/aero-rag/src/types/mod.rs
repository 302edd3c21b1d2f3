//! Core types for the RAG pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{ChunkMetadata, DocumentChunk, EmbeddedChunk, FileType, Page, SourceDocument};
pub use query::AskRequest;
pub use response::{
    AnswerResponse, BatchReport, ChunkFailure, DocumentFailure, FailureStage, IngestionReport,
    RetrievalResult, RetrievedChunk, Source, UploadResponse,
};
