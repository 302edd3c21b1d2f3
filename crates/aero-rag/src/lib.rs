//! aero-rag: Question answering over aerospace manuals
//!
//! Manuals are split into overlapping, page-attributed chunks, embedded and
//! stored in a vector store. Questions are answered by retrieving the most
//! similar chunks and asking a language model to answer from them, returning
//! the answer together with its source excerpts.
//!
//! Hosted (Gemini + Supabase), local (Ollama) and in-process backends sit
//! behind the traits in [`providers`].

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod testing;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::RagPipeline;
pub use types::{
    document::{DocumentChunk, FileType, SourceDocument},
    query::AskRequest,
    response::{AnswerResponse, IngestionReport, Source},
};
