//! The assembled RAG pipeline: provider wiring plus ingestion and query entry points

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::{BackendProvider, RagConfig};
use crate::error::{Error, Result};
use crate::generation::AnswerSynthesizer;
use crate::ingestion::{IngestionOrchestrator, TextChunker};
use crate::providers::{
    ollama, EmbeddingProvider, GeminiClient, GeminiEmbedder, GeminiLlm, InMemoryStore,
    LlmProvider, SupabaseStore, VectorStoreProvider,
};
use crate::retrieval::Retriever;
use crate::types::{AnswerResponse, BatchReport, IngestionReport, RetrievalResult, SourceDocument};

/// Provider availability, as reported by each provider's health check
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    /// Embedding provider name and status
    pub embedder: (String, bool),
    /// Vector store name and status
    pub store: (String, bool),
    /// LLM provider name and status
    pub llm: (String, bool),
}

impl ProviderHealth {
    /// Whether every provider responded
    pub fn all_healthy(&self) -> bool {
        self.embedder.1 && self.store.1 && self.llm.1
    }
}

/// Question answering over ingested documents
pub struct RagPipeline {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    orchestrator: IngestionOrchestrator,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl RagPipeline {
    /// Validate the configuration and build the providers it selects
    pub fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let (embedder, llm, store): (
            Arc<dyn EmbeddingProvider>,
            Arc<dyn LlmProvider>,
            Arc<dyn VectorStoreProvider>,
        ) = match config.backend {
            BackendProvider::Gemini => {
                let client = GeminiClient::new(&config.gemini, &config.retry)?;
                (
                    Arc::new(GeminiEmbedder::new(client.clone(), &config.gemini)),
                    Arc::new(GeminiLlm::new(client, &config.gemini)),
                    Arc::new(SupabaseStore::new(&config.supabase, &config.retry)?),
                )
            }
            BackendProvider::Ollama => {
                let (embedder, llm) = ollama::providers(&config.ollama, &config.retry)?;
                (
                    Arc::new(embedder),
                    Arc::new(llm),
                    Arc::new(SupabaseStore::new(&config.supabase, &config.retry)?),
                )
            }
            BackendProvider::Memory => {
                let (embedder, llm) = ollama::providers(&config.ollama, &config.retry)?;
                (
                    Arc::new(embedder),
                    Arc::new(llm),
                    Arc::new(InMemoryStore::new(config.ollama.dimensions)),
                )
            }
        };

        tracing::info!(
            "Pipeline ready: embeddings={}, store={}, llm={} ({})",
            embedder.name(),
            store.name(),
            llm.name(),
            llm.model()
        );

        Self::from_parts(config, embedder, llm, store)
    }

    /// Build a pipeline around existing providers
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Result<Self> {
        let chunker = TextChunker::from_config(&config.chunking)?;
        let orchestrator = IngestionOrchestrator::new(
            chunker,
            Arc::clone(&embedder),
            Arc::clone(&store),
            config.ingestion.embedding_concurrency(),
        );
        let retriever = Retriever::new(Arc::clone(&embedder), Arc::clone(&store), &config.retrieval);
        let synthesizer = AnswerSynthesizer::new(Arc::clone(&llm), &config.generation);

        Ok(Self {
            config,
            embedder,
            store,
            llm,
            orchestrator,
            retriever,
            synthesizer,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Ingest an already parsed document
    pub async fn ingest_document(&self, doc: &SourceDocument) -> IngestionReport {
        self.orchestrator.ingest(doc).await
    }

    /// Parse and ingest raw file bytes
    pub async fn ingest_bytes(&self, source: &str, data: Vec<u8>) -> Result<IngestionReport> {
        self.orchestrator.ingest_bytes(source, data).await
    }

    /// Ingest a file, or every supported file in a directory
    pub async fn ingest_path(&self, path: &Path) -> Result<BatchReport> {
        if path.is_dir() {
            return self.orchestrator.ingest_directory(path).await;
        }

        let mut batch = BatchReport::default();
        batch.documents.push(self.orchestrator.ingest_path(path).await?);
        Ok(batch)
    }

    /// Ingest every supported file in a directory
    pub async fn ingest_directory(&self, dir: &Path) -> Result<BatchReport> {
        self.orchestrator.ingest_directory(dir).await
    }

    /// Similarity search without answer generation
    pub async fn retrieve(&self, question: &str, top_k: Option<usize>) -> Result<RetrievalResult> {
        let question = non_empty(question)?;
        self.retriever.retrieve(question, top_k).await
    }

    /// Answer a question from the stored documents
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> Result<AnswerResponse> {
        let question = non_empty(question)?;
        tracing::info!("Answering question: {}", question);

        let chunks = self.retriever.retrieve(question, top_k).await?;
        self.synthesizer.synthesize(question, chunks).await
    }

    /// Number of stored records
    pub async fn stored_records(&self) -> Result<usize> {
        self.store.len().await
    }

    /// Run every provider's health check
    pub async fn health(&self) -> ProviderHealth {
        let (embedder, store, llm) = tokio::join!(
            self.embedder.health_check(),
            self.store.health_check(),
            self.llm.health_check()
        );

        ProviderHealth {
            embedder: (self.embedder.name().to_string(), embedder.unwrap_or(false)),
            store: (self.store.name().to_string(), store.unwrap_or(false)),
            llm: (self.llm.name().to_string(), llm.unwrap_or(false)),
        }
    }
}

fn non_empty(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(Error::BadRequest(crate::types::query::NO_QUESTION.to_string()));
    }
    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEmbedder, FakeLlm, FaultyStore};

    fn pipeline(llm: Arc<FakeLlm>, store: Arc<FaultyStore>) -> RagPipeline {
        let mut config = RagConfig::default();
        config.chunking.chunk_size = 200;
        config.chunking.chunk_overlap = 20;
        RagPipeline::from_parts(config, Arc::new(FakeEmbedder::new(64)), llm, store).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_then_ask() {
        let llm = Arc::new(FakeLlm::answering("Nominal pressure is 3000 psi."));
        let rag = pipeline(llm.clone(), Arc::new(FaultyStore::new(64)));

        let doc = SourceDocument::from_texts(
            "manuals/hydraulics.pdf",
            [
                "The hydraulic system operates at a nominal pressure of 3000 psi.",
                "Landing gear retraction takes approximately 8 seconds.",
            ],
        );
        let report = rag.ingest_document(&doc).await;
        assert_eq!(report.stored, 2);

        let answer = rag.ask("What is the hydraulic pressure?", None).await.unwrap();
        assert!(answer.success);
        assert_eq!(answer.answer, "Nominal pressure is 3000 psi.");
        assert_eq!(answer.retrieved_chunks, 2);
        assert_eq!(answer.sources[0].metadata["page"], 1);
        assert_eq!(answer.sources[0].metadata["document"], "hydraulics.pdf");

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Document: hydraulics.pdf (Page 1)"));
        assert!(prompt.contains("Question: What is the hydraulic pressure?"));
    }

    #[tokio::test]
    async fn test_blank_question_makes_no_calls() {
        let llm = Arc::new(FakeLlm::answering("x"));
        let store = Arc::new(FaultyStore::new(64));
        let rag = pipeline(llm.clone(), store.clone());

        let err = rag.ask("   ", None).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(llm.calls(), 0);
        assert_eq!(store.searches(), 0);
    }

    #[tokio::test]
    async fn test_empty_store_answers_without_llm() {
        let llm = Arc::new(FakeLlm::answering("x"));
        let rag = pipeline(llm.clone(), Arc::new(FaultyStore::new(64)));

        let answer = rag.ask("Anything?", None).await.unwrap();
        assert!(answer.success);
        assert_eq!(answer.retrieved_chunks, 0);
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn test_from_config_reports_missing_settings() {
        let err = RagPipeline::from_config(RagConfig::default()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("Backend not properly configured"));
    }

    #[test]
    fn test_memory_backend_builds_without_credentials() {
        let config = RagConfig {
            backend: BackendProvider::Memory,
            ..Default::default()
        };
        let rag = RagPipeline::from_config(config).unwrap();
        assert_eq!(rag.config().backend, BackendProvider::Memory);
    }
}
