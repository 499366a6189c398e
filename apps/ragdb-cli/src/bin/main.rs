use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ragdb_core::config::{Config, Settings};
use ragdb_core::data_processor::{write_processed, DataProcessor};
use ragdb_core::types::{Citation, GenerationOverrides};
use ragdb_embed::default_embedder;
use ragdb_ground::{GroundingReport, GroundingVerifier};
use ragdb_hybrid::{default_generator, Assistant};
use ragdb_vector::{native_available, read_manifest, resolve_backend};

#[derive(Parser)]
#[command(name = "ragdb", about = "Influencer search with grounded answers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize raw JSON or CSV records into a processed dataset
    Etl {
        /// Raw JSON/CSV file or directory (defaults to data.raw_dir)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output file (defaults to data.processed_file)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Process raw records and replace the vector index with them
    Ingest {
        /// Raw JSON/CSV file or directory (defaults to data.raw_dir)
        path: Option<PathBuf>,
        /// Add to the current index instead of replacing it
        #[arg(long)]
        append: bool,
    },
    /// Answer a question from the indexed influencers
    Ask {
        query: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        endpoint: Option<String>,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Raw vector search results
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Score an answer against citations without generating anything
    Verify {
        #[arg(long)]
        query: String,
        #[arg(long)]
        answer: String,
        /// JSON list of citations
        #[arg(long)]
        citations: PathBuf,
    },
    /// Show the persisted index and backend availability
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Config::load()
        .and_then(|config| config.settings())
        .map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    match cli.command {
        Command::Etl { input, output } => etl(&settings, input, output),
        Command::Ingest { path, append } => ingest(&settings, path, append).await,
        Command::Ask { query, model, api_key, endpoint, json } => {
            let overrides = GenerationOverrides { model, api_key, endpoint };
            ask(&settings, &query, &overrides, json).await
        }
        Command::Search { query, limit } => search(&settings, &query, limit).await,
        Command::Verify { query, answer, citations } => verify(&settings, &query, &answer, &citations),
        Command::Status => status(&settings),
    }
}

fn processor(settings: &Settings) -> DataProcessor {
    DataProcessor::new().with_max_chunk_len(settings.data.max_chunk_len)
}

async fn open_assistant(settings: &Settings) -> Assistant {
    Assistant::open(settings, default_embedder(&settings.embedding), default_generator(&settings.generation)).await
}

fn etl(settings: &Settings, input: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let input = input.unwrap_or_else(|| settings.data.raw_path());
    let output = output.unwrap_or_else(|| settings.data.processed_path());
    let outcome = processor(settings).process_path(&input)?;
    write_processed(&outcome.documents, &output)?;
    println!("Processed {} of {} raw records", outcome.documents.len(), outcome.raw_count);
    println!("Wrote {}", output.display());
    Ok(())
}

async fn ingest(settings: &Settings, path: Option<PathBuf>, append: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(|| settings.data.raw_path());
    println!("Ingesting from {}", path.display());
    let outcome = processor(settings).process_path(&path)?;
    if let Err(e) = write_processed(&outcome.documents, &settings.data.processed_path()) {
        tracing::warn!(error = %e, "processed dataset not written");
    }

    let assistant = open_assistant(settings).await.with_progress(true);
    if append {
        let count = assistant.append(outcome.documents).await?;
        println!("✅ Appended; index now holds {} influencers", count);
        return Ok(());
    }

    let summary = assistant.ingest(outcome.documents).await?;
    println!("✅ Ingest complete: {} influencers ({} backend)", summary.count, summary.backend);
    for (niche, count) in &summary.niches {
        println!("   {niche}: {count}");
    }
    println!("📁 Index stored at {}", assistant.persist_dir().display());
    Ok(())
}

async fn ask(settings: &Settings, query: &str, overrides: &GenerationOverrides, json: bool) -> anyhow::Result<()> {
    let assistant = open_assistant(settings).await;
    let response = assistant.ask(query, overrides).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}\n", response.answer);
    if !response.citations.is_empty() {
        println!("Citations:");
        print_citations(&response.citations);
        println!();
    }
    print_report(&response.grounding);
    Ok(())
}

async fn search(settings: &Settings, query: &str, limit: usize) -> anyhow::Result<()> {
    let assistant = open_assistant(settings).await;
    let hits = assistant.search(query, limit).await?;
    if hits.is_empty() {
        println!("No results.");
    } else {
        print_citations(&hits);
    }
    Ok(())
}

fn verify(settings: &Settings, query: &str, answer: &str, citations: &Path) -> anyhow::Result<()> {
    let content = fs::read_to_string(citations).with_context(|| format!("reading {}", citations.display()))?;
    let citations: Vec<Citation> = serde_json::from_str(&content).with_context(|| format!("parsing {}", citations.display()))?;
    let report = GroundingVerifier::new(&settings.grounding).evaluate(query, answer, &citations);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn status(settings: &Settings) -> anyhow::Result<()> {
    let dir = settings.data.persist_path();
    println!("Index directory: {}", dir.display());
    match read_manifest(&dir) {
        Ok(manifest) => {
            let dim = manifest.dim.map_or_else(|| "-".to_string(), |d| d.to_string());
            println!("Backend: {}  Dimension: {}  Documents: {}", manifest.backend, dim, manifest.count);
        }
        Err(e) => println!("No usable index: {}", e),
    }
    println!(
        "Native backend available: {}  Selected for new indexes: {}",
        native_available(),
        resolve_backend(settings.index.use_native)
    );
    Ok(())
}

fn print_citations(citations: &[Citation]) {
    for (i, c) in citations.iter().enumerate() {
        let d = &c.document;
        println!("{:2}. [{:.3}] {} ({}) | {}", i + 1, c.score, d.name, d.handle, d.niche);
        if !d.sample_post.is_empty() {
            println!("      {}", d.sample_post);
        }
    }
}

fn print_report(report: &GroundingReport) {
    let verdict = if report.is_hallucination { "⚠️  possible hallucination" } else { "✅ grounded" };
    println!("Grounding: {} (score {:.3}, confidence {})", verdict, report.score, report.confidence);
    println!(
        "  coverage {:.3}  relevance {:.3}  quality {:.3}",
        report.metrics.citation_coverage, report.metrics.query_relevance, report.metrics.citation_quality
    );
    println!("  {}", report.reason);
    for suggestion in &report.suggestions {
        println!("  - {suggestion}");
    }
}
