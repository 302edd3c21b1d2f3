//! Provider abstractions for embeddings, LLM and vector storage
//!
//! Trait-based seams allow switching between hosted (Gemini + Supabase),
//! local (Ollama) and in-process backends.

pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod retry;
pub mod supabase;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use gemini::{GeminiClient, GeminiEmbedder, GeminiLlm};
pub use llm::LlmProvider;
pub use memory::InMemoryStore;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use retry::RetryPolicy;
pub use supabase::SupabaseStore;
pub use vector_store::{RecordId, VectorStoreProvider};
