//! Ingestion pipeline: parse, chunk, embed and store with failure isolation

use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{
    BatchReport, ChunkFailure, DocumentChunk, DocumentFailure, EmbeddedChunk, FailureStage, FileType,
    IngestionReport, SourceDocument,
};

use super::chunker::TextChunker;
use super::parser::DocumentParser;

/// Drives documents through chunking, embedding and storage
pub struct IngestionOrchestrator {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    /// Maximum chunks (embed plus store) in flight per document
    concurrency: usize,
}

impl IngestionOrchestrator {
    /// Create an orchestrator
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        concurrency: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Chunk, embed and store one parsed document.
    ///
    /// A chunk that fails to embed or store is recorded in the report and the
    /// remaining chunks are still processed.
    pub async fn ingest(&self, doc: &SourceDocument) -> IngestionReport {
        let chunks = self.chunker.chunk_document(doc);
        let mut report = IngestionReport::new(doc.source.clone());
        report.attempted = chunks.len();

        tracing::info!(
            "Ingesting '{}': {} chunks via {} -> {}",
            doc.source,
            chunks.len(),
            self.embedder.name(),
            self.store.name()
        );

        // Each chunk is embedded then stored in one future; outcomes arrive in chunk order
        let mut outcomes = stream::iter(chunks)
            .map(|chunk| {
                Self::embed_and_store(Arc::clone(&self.embedder), Arc::clone(&self.store), chunk)
            })
            .buffered(self.concurrency);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(()) => report.stored += 1,
                Err(failure) => report.failed.push(failure),
            }
        }

        if report.is_complete() {
            tracing::info!("Stored {} chunks from '{}'", report.stored, report.source);
        } else {
            tracing::warn!(
                "Stored {}/{} chunks from '{}' ({} failed)",
                report.stored,
                report.attempted,
                report.source,
                report.failed.len()
            );
        }

        report
    }

    async fn embed_and_store(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        chunk: DocumentChunk,
    ) -> std::result::Result<(), ChunkFailure> {
        let embedding = match embedder.embed(&chunk.content).await {
            Ok(embedding) => embedding,
            Err(e) => return Err(Self::failure(&chunk, FailureStage::Embedding, e.into_embedding())),
        };

        let embedded = EmbeddedChunk { chunk, embedding };
        let chunk = &embedded.chunk;
        store
            .upsert(&chunk.content, &embedded.embedding, &chunk.metadata.to_json())
            .await
            .map(|_| ())
            .map_err(|e| Self::failure(chunk, FailureStage::Store, e.into_store_write()))
    }

    fn failure(chunk: &DocumentChunk, stage: FailureStage, error: Error) -> ChunkFailure {
        tracing::warn!(
            "Chunk {} (page {}) of '{}' failed: {}",
            chunk.metadata.chunk_index,
            chunk.metadata.page,
            chunk.metadata.source,
            error
        );
        ChunkFailure {
            chunk_index: chunk.metadata.chunk_index,
            page: chunk.metadata.page,
            stage,
            reason: error.to_string(),
        }
    }

    /// Parse raw file bytes and ingest them
    pub async fn ingest_bytes(&self, source: &str, data: Vec<u8>) -> Result<IngestionReport> {
        let doc = Self::parse(source.to_string(), data).await?;
        Ok(self.ingest(&doc).await)
    }

    /// Read, parse and ingest one file
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestionReport> {
        let source = path.display().to_string();
        if !FileType::from_path(path).is_supported() {
            return Err(Error::UnsupportedFileType(source));
        }

        let data = tokio::fs::read(path).await?;
        self.ingest_bytes(&source, data).await
    }

    /// Ingest every supported file directly inside `dir`, in file name order.
    ///
    /// A document that cannot be read or parsed is recorded and the rest continue.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<BatchReport> {
        if !dir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            )));
        }

        let mut batch = BatchReport::default();
        let entries: Vec<_> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .collect();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let source = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| dir.display().to_string());
                    tracing::warn!("Skipping unreadable entry {}: {}", source, e);
                    batch.failed_documents.push(DocumentFailure {
                        source,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !FileType::from_path(path).is_supported() {
                continue;
            }

            match self.ingest_path(path).await {
                Ok(report) => batch.documents.push(report),
                Err(e) => {
                    tracing::warn!("Error processing {}: {}", path.display(), e);
                    batch.failed_documents.push(DocumentFailure {
                        source: path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Batch ingestion of {}: {} documents, {} chunks stored, {} chunks failed, {} documents failed",
            dir.display(),
            batch.documents.len(),
            batch.stored(),
            batch.failed_chunks(),
            batch.failed_documents.len()
        );

        Ok(batch)
    }

    /// Parse on the blocking pool; PDF extraction is CPU-bound
    async fn parse(source: String, data: Vec<u8>) -> Result<SourceDocument> {
        tokio::task::spawn_blocking(move || DocumentParser::parse(&source, &data))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}
