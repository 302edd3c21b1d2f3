//! RAG Server binary
//!
//! Run with: cargo run -p aero-rag --bin aero-rag-server [-- --config <config.toml>]

use aero_rag::{
    config::{BackendProvider, RagConfig},
    server::RagServer,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aero_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                     Aero RAG System                       ║
║        Aerospace Manual Q&A with Source Excerpts          ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let mut args = std::env::args().skip(1);
    let config_path = match args.next().as_deref() {
        Some("--config") | Some("-c") => args.next(),
        other => other.map(str::to_string),
    }
    .map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.backend);
    match config.backend {
        BackendProvider::Gemini => {
            tracing::info!("  - Embedding model: {}", config.gemini.embedding_model);
            tracing::info!("  - LLM model: {}", config.gemini.generation_model);
        }
        BackendProvider::Ollama | BackendProvider::Memory => {
            tracing::info!("  - Embedding model: {}", config.ollama.embed_model);
            tracing::info!("  - LLM model: {}", config.ollama.generate_model);
        }
    }
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    // Create and start server
    let server = RagServer::new(config);
    if !server.is_ready() {
        tracing::warn!("Starting without a working pipeline; see the configuration error above");
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload - Upload a manual (multipart field 'file')");
    println!("  POST /ask    - Ask a question ({{\"question\": \"...\"}})");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
