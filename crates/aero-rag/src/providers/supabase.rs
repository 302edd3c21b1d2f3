//! Supabase vector store over PostgREST
//!
//! Rows live in a table with `content`, `embedding` (pgvector) and `metadata`
//! (jsonb) columns. Similarity search goes through an RPC function taking
//! `query_embedding` and `match_count` and returning
//! `id, content, metadata, similarity`.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::{RetryConfig, SupabaseConfig};
use crate::error::{Error, Result};
use crate::types::{RetrievalResult, RetrievedChunk};

use super::retry::{check_status, read_json, CallError, RetryPolicy};
use super::vector_store::{rank, RecordId, VectorStoreProvider};

/// Supabase-backed vector store
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    key: String,
    table: String,
    match_function: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    content: &'a str,
    embedding: &'a [f32],
    metadata: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct InsertedRow {
    id: Value,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
}

#[derive(Deserialize)]
struct MatchRow {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
    #[serde(default)]
    similarity: f32,
}

impl MatchRow {
    fn into_chunk(self) -> Option<RetrievedChunk> {
        Some(RetrievedChunk {
            id: self.id.map(id_string),
            content: self.content?,
            metadata: self.metadata.unwrap_or_default(),
            similarity: self.similarity,
        })
    }
}

fn id_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl SupabaseStore {
    /// Create a store; fails when URL or key are missing
    pub fn new(config: &SupabaseConfig, retry: &RetryConfig) -> Result<Self> {
        let (url, key) = config.require_credentials()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            key: key.to_string(),
            table: config.table.clone(),
            match_function: config.match_function.clone(),
            retry: RetryPolicy::from_config(retry),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.key))
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.rest_url, self.table)
    }

    fn rpc_url(&self) -> String {
        format!("{}/rpc/{}", self.rest_url, self.match_function)
    }
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/0`
fn parse_content_range_total(value: &str) -> Option<usize> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl VectorStoreProvider for SupabaseStore {
    async fn upsert(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Map<String, Value>,
    ) -> Result<RecordId> {
        let url = self.table_url();
        let url = url.as_str();
        let row = &InsertRow {
            content,
            embedding,
            metadata,
        };

        let rows: Vec<InsertedRow> = self
            .retry
            .run("Supabase insert", move || async move {
                let response = self
                    .authorized(self.client.post(url))
                    .header("Prefer", "return=representation")
                    .json(row)
                    .send()
                    .await
                    .map_err(CallError::from_reqwest)?;
                read_json(response).await
            })
            .await
            .map_err(|e| Error::StoreWrite(format!("Supabase: {}", e)))?;

        rows.into_iter()
            .next()
            .map(|r| id_string(r.id))
            .ok_or_else(|| Error::StoreWrite("Supabase returned no inserted row".to_string()))
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<RetrievalResult> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let url = self.rpc_url();
        let url = url.as_str();
        let request = &MatchRequest {
            query_embedding,
            match_count: top_k,
        };

        let rows: Vec<MatchRow> = self
            .retry
            .run("Supabase search", move || async move {
                let response = self
                    .authorized(self.client.post(url))
                    .json(request)
                    .send()
                    .await
                    .map_err(CallError::from_reqwest)?;
                read_json(response).await
            })
            .await
            .map_err(|e| Error::StoreRead(format!("Supabase: {}", e)))?;

        let hits = rows.into_iter().filter_map(MatchRow::into_chunk).collect();
        Ok(rank(hits, top_k))
    }

    async fn len(&self) -> Result<usize> {
        let url = format!("{}?select=id", self.table_url());
        let url = url.as_str();

        let response = self
            .retry
            .run("Supabase count", move || async move {
                let response = self
                    .authorized(self.client.get(url))
                    .header("Prefer", "count=exact")
                    .header(header::RANGE, "0-0")
                    .send()
                    .await
                    .map_err(CallError::from_reqwest)?;
                check_status(response).await
            })
            .await
            .map_err(|e| Error::StoreRead(format!("Supabase: {}", e)))?;

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| Error::StoreRead("Supabase returned no row count".to_string()))
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .authorized(self.client.get(format!("{}/", self.rest_url)))
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }

    fn name(&self) -> &str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SupabaseConfig {
        SupabaseConfig {
            url: Some("https://abc.supabase.co/".to_string()),
            key: Some("service-key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_urls() {
        let store = SupabaseStore::new(&config(), &RetryConfig::default()).unwrap();
        assert_eq!(store.table_url(), "https://abc.supabase.co/rest/v1/documents");
        assert_eq!(store.rpc_url(), "https://abc.supabase.co/rest/v1/rpc/match_documents");
    }

    #[test]
    fn test_missing_credentials() {
        let err = SupabaseStore::new(&SupabaseConfig::default(), &RetryConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(ref m) if m.contains("SUPABASE_URL")));
    }

    #[test]
    fn test_match_rows_without_content_are_dropped() {
        let rows: Vec<MatchRow> = serde_json::from_str(
            r#"[
                {"id": 7, "content": "Bleed valve", "metadata": {"source": "a.pdf", "page": 2}, "similarity": 0.8},
                {"id": 8, "content": null, "metadata": null, "similarity": 0.9}
            ]"#,
        )
        .unwrap();
        let hits: Vec<_> = rows.into_iter().filter_map(MatchRow::into_chunk).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_deref(), Some("7"));
        assert_eq!(hits[0].page(), Some(2));
    }

    #[test]
    fn test_content_range_parsing() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-0/*"), None);
    }
}
