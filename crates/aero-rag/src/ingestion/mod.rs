//! Document ingestion: parsing, chunking and storage orchestration

pub mod chunker;
pub mod orchestrator;
pub mod parser;

pub use chunker::TextChunker;
pub use orchestrator::IngestionOrchestrator;
pub use parser::DocumentParser;
