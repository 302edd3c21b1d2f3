//! Similarity retrieval: embed the question, then search the vector store

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::RetrievalResult;

/// Finds the stored chunks most similar to a question
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    default_top_k: usize,
    max_top_k: usize,
}

impl Retriever {
    /// Create a retriever
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            default_top_k: config.top_k,
            max_top_k: config.max_top_k,
        }
    }

    /// Retrieve up to `top_k` chunks (configured default when `None`), most similar first
    pub async fn retrieve(&self, question: &str, top_k: Option<usize>) -> Result<RetrievalResult> {
        let k = top_k.unwrap_or(self.default_top_k).min(self.max_top_k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| e.into_embedding())?;

        let results = self
            .store
            .search(&query_embedding, k)
            .await
            .map_err(|e| e.into_store_read())?;

        tracing::info!(
            "Retrieved {} chunks (k={}) from {}",
            results.len(),
            k,
            self.store.name()
        );

        Ok(results)
    }
}
