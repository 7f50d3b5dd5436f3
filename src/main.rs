use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use codegraph::chunker::{BoundaryAdvisor, HttpBoundaryAdvisor, NoopAdvisor};
use codegraph::config::Config;
use codegraph::embedder::http::HttpEmbedder;
use codegraph::embedder::mock::MockEmbedder;
use codegraph::embedder::Embedder;
use codegraph::pipeline::Pipeline;
use codegraph::sink::{GraphSink, MemoryGraphSink, MemoryVectorSink, SqliteStore, VectorSink};

#[derive(Parser)]
#[command(name = "codegraph", version, about = "Index a source tree into a searchable knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan, chunk, extract and resolve a project directory
    Index {
        /// Root directory of the project to index
        path: PathBuf,

        /// Path to the configuration file
        #[arg(short, long, default_value = "")]
        config: String,

        /// Run the full pipeline without persisting or calling services
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Index {
            path,
            config,
            dry_run,
        } => index(path, &config, dry_run).await,
    }
}

async fn index(path: PathBuf, config_path: &str, dry_run: bool) -> Result<()> {
    let config = Config::load(config_path)?;
    config.validate().context("invalid configuration")?;

    anyhow::ensure!(path.is_dir(), "not a directory: {}", path.display());
    info!("Indexing {}", path.display());

    let advisor: Arc<dyn BoundaryAdvisor> = if config.advisor.enabled && !dry_run {
        Arc::new(HttpBoundaryAdvisor::new(
            config.advisor.url.clone(),
            Duration::from_millis(config.advisor.timeout_ms),
        ))
    } else {
        Arc::new(NoopAdvisor)
    };

    let report = if dry_run {
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::default());
        let graph = Arc::new(MemoryGraphSink::default());
        let vectors = Arc::new(MemoryVectorSink::default());
        Pipeline::new(advisor, embedder, graph, vectors, config)
            .run(&path)
            .await?
    } else {
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
            &config.embedding.url,
            config.embedding.model.clone(),
            config.embedding.dimensions,
        ));
        let store = Arc::new(SqliteStore::open(&config.db_path)?);
        let graph: Arc<dyn GraphSink> = store.clone();
        let vectors: Arc<dyn VectorSink> = store;
        Pipeline::new(advisor, embedder, graph, vectors, config)
            .run(&path)
            .await?
    };

    println!(
        "{} files indexed, {} skipped, {} failed, {} degraded",
        report.indexed, report.skipped, report.failed, report.degraded
    );
    println!(
        "{} chunks embedded ({} failures), {} relationship edges",
        report.chunks_embedded, report.embed_failures, report.edges_emitted
    );
    Ok(())
}
