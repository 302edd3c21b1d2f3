//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{RetrievalResult, RetrievedChunk};

/// Opaque store-assigned record identifier
pub type RecordId = String;

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `SupabaseStore`: Supabase/PostgREST table with a pgvector match function
/// - `InMemoryStore`: Process-local cosine similarity store
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Persist a chunk with its embedding and metadata
    async fn upsert(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Map<String, Value>,
    ) -> Result<RecordId>;

    /// Return up to `top_k` stored chunks, most similar first
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<RetrievalResult>;

    /// Get total number of records stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Sort by descending similarity, drop entries without content, keep `top_k`
pub fn rank(mut results: Vec<RetrievedChunk>, top_k: usize) -> RetrievalResult {
    results.retain(|r| !r.content.trim().is_empty());
    results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(content: &str, similarity: f32) -> RetrievedChunk {
        RetrievedChunk {
            id: None,
            content: content.to_string(),
            metadata: Map::new(),
            similarity,
        }
    }

    #[test]
    fn test_rank_orders_filters_and_truncates() {
        let ranked = rank(
            vec![hit("a", 0.2), hit("", 0.99), hit("b", 0.9), hit("c", 0.5)],
            2,
        );
        let contents: Vec<_> = ranked.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["b", "c"]);
    }

    #[test]
    fn test_rank_never_pads() {
        assert_eq!(rank(vec![hit("a", 0.1)], 5).len(), 1);
        assert!(rank(Vec::new(), 5).is_empty());
    }
}
