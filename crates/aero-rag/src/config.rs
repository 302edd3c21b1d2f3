//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable pointing at a TOML configuration file
pub const CONFIG_PATH_ENV: &str = "AERO_RAG_CONFIG";

/// Template values shipped in example `.env` files; treated as unset
const PLACEHOLDER_VALUES: &[&str] = &[
    "your_supabase_url_here",
    "your_supabase_key_here",
    "your_google_api_key_here",
];

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Provider backend selection
    pub backend: BackendProvider,
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Answer synthesis configuration
    pub generation: GenerationConfig,
    /// Ingestion configuration
    pub ingestion: IngestionConfig,
    /// Retry policy shared by all network providers
    pub retry: RetryConfig,
    /// Google Gemini configuration
    pub gemini: GeminiConfig,
    /// Ollama configuration
    pub ollama: OllamaConfig,
    /// Supabase vector store configuration
    pub supabase: SupabaseConfig,
}

impl RagConfig {
    /// Load configuration: defaults, then an optional TOML file, then environment overrides.
    ///
    /// When `path` is `None` the file named by `AERO_RAG_CONFIG` is used, falling back to
    /// `<config dir>/aero-rag/config.toml` if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(|| {
                dirs::config_dir()
                    .map(|dir| dir.join("aero-rag").join("config.toml"))
                    .filter(|p| p.exists())
            });

        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    Error::config(format!("cannot read config file {}: {}", path.display(), e))
                })?;
                tracing::info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("invalid config file: {}", e)))
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL") {
            self.supabase.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_KEY").or_else(|| lookup("SUPABASE_ANON_KEY")) {
            self.supabase.key = Some(key);
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.ollama.base_url = url;
        }
        if let Some(backend) = lookup("AERO_RAG_BACKEND") {
            match backend.to_lowercase().as_str() {
                "gemini" => self.backend = BackendProvider::Gemini,
                "ollama" => self.backend = BackendProvider::Ollama,
                "memory" => self.backend = BackendProvider::Memory,
                other => tracing::warn!("Ignoring unknown AERO_RAG_BACKEND value '{}'", other),
            }
        }
        if let Some(host) = lookup("AERO_RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("AERO_RAG_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid AERO_RAG_PORT value '{}'", port),
            }
        }
    }

    /// Check that the configuration can build a working pipeline
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be at least 1"));
        }
        if self.retrieval.max_top_k < self.retrieval.top_k {
            return Err(Error::config("retrieval.max_top_k must be >= retrieval.top_k"));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(Error::config("server.request_timeout_ms must be positive"));
        }
        if self.generation.max_prompt_chars == 0 {
            return Err(Error::config("generation.max_prompt_chars must be positive"));
        }

        match self.backend {
            BackendProvider::Gemini => {
                self.gemini.require_api_key()?;
                self.supabase.require_credentials()?;
            }
            BackendProvider::Ollama => {
                self.supabase.require_credentials()?;
            }
            BackendProvider::Memory => {}
        }

        Ok(())
    }
}

/// Returns the value unless it is blank or a template placeholder
pub(crate) fn configured(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !PLACEHOLDER_VALUES.contains(v))
}

/// Backend provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Gemini embeddings and generation, Supabase vector store
    #[default]
    Gemini,
    /// Ollama embeddings and generation, Supabase vector store
    Ollama,
    /// Ollama embeddings and generation, in-process vector store
    Memory,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS for all origins
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
    /// Upper bound for a single /ask or /upload request, in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
            request_timeout_ms: 300_000,
        }
    }
}

impl ServerConfig {
    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in text units
    pub chunk_size: usize,
    /// Overlap between consecutive chunks of a page in text units
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Check size/overlap consistency
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Upper bound accepted from callers overriding `top_k`
    pub max_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_top_k: 50,
        }
    }
}

/// What the synthesizer does when the language model call fails
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisPolicy {
    /// Return the error text as the answer with `success = false`
    #[default]
    Degrade,
    /// Propagate the failure to the caller
    FailFast,
}

/// Answer synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Prompt budget in characters; lowest-similarity chunks are dropped to fit
    pub max_prompt_chars: usize,
    /// Length of the content excerpt returned for each source
    pub excerpt_chars: usize,
    /// Failure policy for the language model call
    pub on_failure: SynthesisPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 24_000,
            excerpt_chars: 200,
            on_failure: SynthesisPolicy::Degrade,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Concurrent embedding calls per document (default: CPU count, max 4)
    pub parallel_embeddings: Option<usize>,
}

impl IngestionConfig {
    /// Effective embedding concurrency
    pub fn embedding_concurrency(&self) -> usize {
        self.parallel_embeddings
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Google Gemini (Generative Language API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key (`GOOGLE_API_KEY`)
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Embedding model name
    pub embedding_model: String,
    /// Embedding dimensions produced by `embedding_model`
    pub dimensions: usize,
    /// Generation model name
    pub generation_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens generated per answer
    pub max_output_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embedding_model: "embedding-001".to_string(),
            dimensions: 768,
            generation_model: "gemini-pro".to_string(),
            temperature: 0.3,
            max_output_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    /// API key or a configuration error naming the missing variable
    pub fn require_api_key(&self) -> Result<&str> {
        configured(&self.api_key)
            .ok_or_else(|| Error::config("GOOGLE_API_KEY is not set"))
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Embedding dimensions produced by `embed_model`
    pub dimensions: usize,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            dimensions: 768,
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
        }
    }
}

/// Supabase (PostgREST) vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project URL (`SUPABASE_URL`)
    pub url: Option<String>,
    /// Service or anon key (`SUPABASE_KEY`)
    pub key: Option<String>,
    /// Table holding `content`, `embedding` and `metadata`
    pub table: String,
    /// Similarity search function exposed over RPC
    pub match_function: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            table: "documents".to_string(),
            match_function: "match_documents".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SupabaseConfig {
    /// URL and key, or a configuration error naming what is missing
    pub fn require_credentials(&self) -> Result<(&str, &str)> {
        let url = configured(&self.url)
            .ok_or_else(|| Error::config("SUPABASE_URL is not set"))?;
        let key = configured(&self.key)
            .ok_or_else(|| Error::config("SUPABASE_KEY is not set"))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config(format!("SUPABASE_URL must be an http(s) URL, got '{}'", url)));
        }
        Ok((url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_documented_surface() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.supabase.table, "documents");
        assert_eq!(config.backend, BackendProvider::Gemini);
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let config = RagConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("GOOGLE_API_KEY")));
    }

    #[test]
    fn test_placeholder_values_count_as_missing() {
        let mut config = RagConfig::default();
        config.apply_env(env(&[
            ("GOOGLE_API_KEY", "your_google_api_key_here"),
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_KEY", "secret"),
        ]));
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides_complete_the_config() {
        let mut config = RagConfig::default();
        config.apply_env(env(&[
            ("GOOGLE_API_KEY", "key"),
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_KEY", "secret"),
            ("AERO_RAG_PORT", "9090"),
        ]));
        config.validate().unwrap();
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_memory_backend_needs_no_credentials() {
        let mut config = RagConfig::default();
        config.apply_env(env(&[("AERO_RAG_BACKEND", "memory")]));
        assert_eq!(config.backend, BackendProvider::Memory);
        config.validate().unwrap();
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let config = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_toml_partial_sections_use_defaults() {
        let config = RagConfig::from_toml_str(
            r#"
            backend = "ollama"

            [chunking]
            chunk_size = 500

            [generation]
            on_failure = "fail_fast"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, BackendProvider::Ollama);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.generation.on_failure, SynthesisPolicy::FailFast);
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_request_timeout_has_millisecond_granularity() {
        let config = RagConfig::from_toml_str(
            r#"
            backend = "memory"

            [server]
            request_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.server.request_timeout(), Duration::from_millis(250));
        assert_eq!(
            RagConfig::default().server.request_timeout(),
            Duration::from_secs(300)
        );

        let mut config = config;
        config.server.request_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config(ref m)) if m.contains("request_timeout_ms")));
    }
}
