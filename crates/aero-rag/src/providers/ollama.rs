//! Ollama-based providers for embeddings and answer generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{OllamaConfig, RetryConfig};
use crate::error::{Error, Result};

use super::embedding::{check_dimensions, EmbeddingProvider};
use super::llm::LlmProvider;
use super::retry::{read_json, CallError, RetryPolicy};

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: OllamaConfig,
    /// Backoff for transient failures
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &OllamaConfig, retry: &RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            retry: RetryPolicy::from_config(retry),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.url("/api/embeddings");
        let request = EmbedRequest {
            model: &self.config.embed_model,
            prompt: text,
        };

        let response: EmbedResponse = self
            .send("Ollama embedding", &url, &request)
            .await
            .map_err(|e| Error::Embedding(format!("Ollama: {}", e)))?;

        Ok(response.embedding)
    }

    /// Complete a prompt with retry
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.url("/api/generate");
        let request = GenerateRequest {
            model: &self.config.generate_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };

        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        let response: GenerateResponse = self
            .send("Ollama generation", &url, &request)
            .await
            .map_err(|e| Error::Synthesis(format!("Ollama: {}", e)))?;

        if response.response.trim().is_empty() {
            return Err(Error::Synthesis("Ollama returned an empty answer".to_string()));
        }
        Ok(response.response)
    }

    async fn send<Req, Resp>(&self, what: &str, url: &str, body: &Req) -> std::result::Result<Resp, CallError>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let client = &self.client;
        self.retry
            .run(what, move || async move {
                let response = client
                    .post(url)
                    .json(body)
                    .send()
                    .await
                    .map_err(CallError::from_reqwest)?;
                read_json(response).await
            })
            .await
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.client.embed(text).await?;
        check_dimensions("Ollama", self.dimensions, &embedding)?;
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>) -> Self {
        let model = client.config.generate_model.clone();
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build an embedder and LLM sharing one client
pub fn providers(config: &OllamaConfig, retry: &RetryConfig) -> Result<(OllamaEmbedder, OllamaLlm)> {
    let client = Arc::new(OllamaClient::new(config, retry)?);
    Ok((
        OllamaEmbedder::from_client(Arc::clone(&client), config.dimensions),
        OllamaLlm::from_client(client),
    ))
}
