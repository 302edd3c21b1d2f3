//! Embedding provider trait for turning text into vectors

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations:
/// - `GeminiEmbedder`: Google Generative Language API (embedding-001)
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimensions (e.g., 768 for embedding-001 and nomic-embed-text)
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Reject vectors whose length differs from the configured dimensions
pub(crate) fn check_dimensions(provider: &str, expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(Error::Embedding(format!(
            "{} returned {} dimensions, expected {}",
            provider,
            embedding.len(),
            expected
        )));
    }
    Ok(())
}
