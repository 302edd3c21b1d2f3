//! Google Gemini providers via the Generative Language API
//!
//! Embeddings use `embedContent` and answers use `generateContent`. Both
//! authenticate with an API key header and share one pooled HTTP client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{GeminiConfig, RetryConfig};
use crate::error::{Error, Result};

use super::embedding::{check_dimensions, EmbeddingProvider};
use super::llm::LlmProvider;
use super::retry::{read_json, CallError, RetryPolicy};

/// Shared HTTP plumbing for Gemini endpoints
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Create a client; fails when the API key is missing
    pub fn new(config: &GeminiConfig, retry: &RetryConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from_config(retry),
        })
    }

    fn model_url(&self, model: &str, method: Option<&str>) -> String {
        match method {
            Some(method) => format!("{}/models/{}:{}", self.base_url, model, method),
            None => format!("{}/models/{}", self.base_url, model),
        }
    }

    async fn post<Req, Resp>(&self, what: &str, url: &str, body: &Req) -> std::result::Result<Resp, CallError>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        self.retry
            .run(what, move || async move {
                let response = self
                    .client
                    .post(url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(body)
                    .send()
                    .await
                    .map_err(CallError::from_reqwest)?;
                read_json(response).await
            })
            .await
    }

    async fn model_available(&self, model: &str) -> bool {
        let response = self
            .client
            .get(self.model_url(model, None))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await;
        matches!(response, Ok(r) if r.status().is_success())
    }
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini embedding provider
pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    /// Create from an existing client
    pub fn new(client: GeminiClient, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: config.embedding_model.clone(),
            dimensions: config.dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let url = self.client.model_url(&self.model, Some("embedContent"));
        let response: EmbedResponse = self
            .client
            .post("Gemini embedding", &url, &request)
            .await
            .map_err(|e| Error::Embedding(format!("Gemini: {}", e)))?;

        let embedding = response.embedding.values;
        check_dimensions("Gemini", self.dimensions, &embedding)?;
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.model_available(&self.model).await)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if !text.trim().is_empty() {
            return Ok(text);
        }

        match self.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(Error::Synthesis(format!("Gemini blocked the prompt: {}", reason))),
            None => Err(Error::Synthesis("No text in Gemini response".to_string())),
        }
    }
}

/// Gemini answer generation provider
pub struct GeminiLlm {
    client: GeminiClient,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiLlm {
    /// Create from an existing client
    pub fn new(client: GeminiClient, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: config.generation_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        tracing::info!("Generating answer with model: {}", self.model);

        let url = self.client.model_url(&self.model, Some("generateContent"));
        let response: GenerateResponse = self
            .client
            .post("Gemini generation", &url, &request)
            .await
            .map_err(|e| Error::Synthesis(format!("Gemini: {}", e)))?;

        response.into_text()
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.model_available(&self.model).await)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
