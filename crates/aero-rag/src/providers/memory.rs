//! Process-local vector store with brute-force cosine similarity

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{RetrievalResult, RetrievedChunk};

use super::vector_store::{rank, RecordId, VectorStoreProvider};

struct Record {
    id: RecordId,
    content: String,
    embedding: Vec<f32>,
    metadata: Map<String, Value>,
}

/// In-memory vector store used by the `memory` backend, the CLI and tests
pub struct InMemoryStore {
    dimensions: usize,
    records: RwLock<Vec<Record>>,
}

impl InMemoryStore {
    /// Create an empty store accepting vectors of `dimensions` length
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            records: RwLock::new(Vec::new()),
        }
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStoreProvider for InMemoryStore {
    async fn upsert(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Map<String, Value>,
    ) -> Result<RecordId> {
        if embedding.len() != self.dimensions {
            return Err(Error::StoreWrite(format!(
                "embedding has {} dimensions, store expects {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let id = Uuid::new_v4().to_string();
        self.records.write().push(Record {
            id: id.clone(),
            content: content.to_string(),
            embedding: embedding.to_vec(),
            metadata: metadata.clone(),
        });
        Ok(id)
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<RetrievalResult> {
        if query_embedding.len() != self.dimensions {
            return Err(Error::StoreRead(format!(
                "query has {} dimensions, store expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let hits = self
            .records
            .read()
            .iter()
            .map(|r| RetrievedChunk {
                id: Some(r.id.clone()),
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                similarity: cosine_similarity(query_embedding, &r.embedding),
            })
            .collect();

        Ok(rank(hits, top_k))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_returns_closest_first() {
        let store = InMemoryStore::new(2);
        let meta = Map::new();
        store.upsert("north", &[0.0, 1.0], &meta).await.unwrap();
        store.upsert("east", &[1.0, 0.0], &meta).await.unwrap();
        store.upsert("north-east", &[1.0, 1.0], &meta).await.unwrap();

        let hits = store.search(&[0.1, 1.0], 5).await.unwrap();
        let order: Vec<_> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(order, vec!["north", "north-east", "east"]);
        assert!(hits.iter().all(|h| h.id.is_some()));
    }

    #[tokio::test]
    async fn test_fewer_records_than_k() {
        let store = InMemoryStore::new(2);
        store.upsert("only", &[1.0, 0.0], &Map::new()).await.unwrap();
        assert_eq!(store.search(&[1.0, 0.0], 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let store = InMemoryStore::new(3);
        let err = store.upsert("x", &[1.0], &Map::new()).await.unwrap_err();
        assert!(matches!(err, Error::StoreWrite(_)));
        let err = store.search(&[1.0], 1).await.unwrap_err();
        assert!(matches!(err, Error::StoreRead(_)));
        assert!(store.is_empty().await.unwrap());
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
