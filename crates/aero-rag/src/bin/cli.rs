//! Command line access to the RAG pipeline
//!
//! Run with: cargo run -p aero-rag --features cli --bin aero-rag -- <command>

use aero_rag::{config::RagConfig, types::BatchReport, RagPipeline};
use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "aero-rag", version, about = "Ingest aerospace manuals and ask questions about them")]
struct Cli {
    /// Configuration file (defaults to $AERO_RAG_CONFIG or the user config directory)
    #[arg(long, short, global = true, env = "AERO_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a manual, or every PDF/text file in a directory
    Ingest {
        /// File or directory to ingest
        path: PathBuf,
    },
    /// Answer a question from the stored manuals
    Ask {
        /// The question
        question: String,
        /// Number of chunks to retrieve
        #[arg(long, short)]
        k: Option<usize>,
    },
    /// Show the chunks most similar to a query, without generating an answer
    Search {
        /// The query text
        query: String,
        /// Number of chunks to retrieve
        #[arg(long, short)]
        k: Option<usize>,
    },
    /// Check provider availability and stored record count
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aero_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref())?;
    let pipeline = RagPipeline::from_config(config).context("failed to build the pipeline")?;

    match cli.command {
        Command::Ingest { path } => ingest(&pipeline, path).await,
        Command::Ask { question, k } => ask(&pipeline, &question, k).await,
        Command::Search { query, k } => search(&pipeline, &query, k).await,
        Command::Status => status(&pipeline).await,
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

async fn ingest(pipeline: &RagPipeline, path: PathBuf) -> anyhow::Result<()> {
    let bar = spinner(format!("Ingesting {}", path.display()));
    let batch = pipeline.ingest_path(&path).await;
    bar.finish_and_clear();

    print_batch(&batch?);
    Ok(())
}

fn print_batch(batch: &BatchReport) {
    for report in &batch.documents {
        let marker = if report.is_complete() {
            style("✓").green()
        } else if report.is_total_failure() {
            style("✗").red()
        } else {
            style("!").yellow()
        };
        println!(
            "{} {} ({}/{} chunks stored)",
            marker, report.source, report.stored, report.attempted
        );
        for failure in &report.failed {
            println!(
                "    chunk {} (page {}): {}",
                failure.chunk_index,
                failure.page,
                style(&failure.reason).dim()
            );
        }
    }
    for failure in &batch.failed_documents {
        println!("{} {}: {}", style("✗").red(), failure.source, failure.reason);
    }

    println!(
        "\n{} {} documents, {} chunks stored, {} chunks failed, {} documents failed",
        style("Done:").bold(),
        batch.documents.len(),
        batch.stored(),
        batch.failed_chunks(),
        batch.failed_documents.len()
    );
}

async fn ask(pipeline: &RagPipeline, question: &str, k: Option<usize>) -> anyhow::Result<()> {
    let bar = spinner("Thinking...".to_string());
    let response = pipeline.ask(question, k).await;
    bar.finish_and_clear();
    let response = response?;

    if response.success {
        println!("{}\n", response.answer);
    } else {
        println!("{}", style(&response.answer).red());
    }

    if !response.sources.is_empty() {
        println!("{}", style("Sources:").bold());
        for (i, source) in response.sources.iter().enumerate() {
            let document = source
                .metadata
                .get("document")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let page = source
                .metadata
                .get("page")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!(
                "  [{}] {} p.{} ({:.3}) {}",
                i + 1,
                style(document).cyan(),
                page,
                source.similarity,
                style(&source.content).dim()
            );
        }
    }

    Ok(())
}

async fn search(pipeline: &RagPipeline, query: &str, k: Option<usize>) -> anyhow::Result<()> {
    let results = pipeline.retrieve(query, k).await?;
    if results.is_empty() {
        println!("No matching chunks.");
        return Ok(());
    }

    for (i, chunk) in results.iter().enumerate() {
        println!(
            "{} {} p.{} (similarity {:.3})",
            style(format!("[{}]", i + 1)).bold(),
            style(chunk.source().unwrap_or("unknown")).cyan(),
            chunk.page().map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
            chunk.similarity
        );
        println!("{}\n", chunk.content.trim());
    }

    Ok(())
}

async fn status(pipeline: &RagPipeline) -> anyhow::Result<()> {
    let health = pipeline.health().await;
    for (role, (name, ok)) in [
        ("embeddings", &health.embedder),
        ("vector store", &health.store),
        ("llm", &health.llm),
    ] {
        let state = if *ok { style("up").green() } else { style("down").red() };
        println!("{:<13} {:<10} {}", role, name, state);
    }

    match pipeline.stored_records().await {
        Ok(count) => println!("{:<13} {}", "records", count),
        Err(e) => println!("{:<13} {}", "records", style(e).red()),
    }

    if !health.all_healthy() {
        anyhow::bail!("one or more providers are unavailable");
    }
    Ok(())
}
