use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use brew_cli::{render_answer, AnswerRecord, Mode, Portal};
use brew_core::settings::DEFAULT_CONFIG_PATH;
use brew_core::{Embedder, Error, LLMProvider, Settings, VectorStore};
use brew_openai::{OpenAIClient, OpenAIConfig, OpenAIEmbedder};
use brew_rag::ingest::TimedTextTranscripts;
use brew_rag::{
    AgentPipeline, HashEmbedder, HealthReport, Ingestor, LocalVectorStore, Retriever,
    SourceLoader, SourceValidator, TextSplitter,
};

#[derive(Parser)]
#[command(name = "brew")]
#[command(about = "Coffee learning portal with grounded, cited answers", version)]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive learning portal (default)
    Portal,
    /// Answer one question and exit
    Ask {
        question: String,
        /// Run the researcher, synthesizer and critic pipeline
        #[arg(long)]
        multi_agent: bool,
        /// Passages retrieved per lookup
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Load the sources listed in the manifest into the local index
    Ingest {
        /// Manifest CSV (defaults to `sources_csv` from the settings)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Empty the index before ingesting
        #[arg(long)]
        rebuild: bool,
    },
    /// Check that every manifest row can be loaded
    Validate {
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Show the configured stack and index size
    Health,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    if settings.uses_hash_embedder() {
        return Ok(Arc::new(HashEmbedder::new()));
    }
    let config = OpenAIConfig::from_env().context("embedding model requires API credentials")?;
    Ok(Arc::new(OpenAIEmbedder::new(config, &settings.embedding_model)?))
}

fn open_store(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Arc<LocalVectorStore>> {
    let path = settings.index_path();
    let store = LocalVectorStore::open(&path, embedder)
        .with_context(|| format!("failed to open index at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_llm(settings: &Settings) -> Result<Arc<dyn LLMProvider>> {
    let client = OpenAIClient::from_env()
        .context("set OPENAI_API_KEY (or add it to .env) to generate answers")?
        .with_model(&settings.llm_model)
        .with_temperature(settings.temperature)
        .with_timeout(settings.request_timeout())
        .with_max_retries(settings.max_retries);
    Ok(Arc::new(client))
}

/// Construct the shared clients once and hand them out by `Arc`
fn build_answering(settings: &Settings) -> Result<(Arc<Retriever>, Arc<AgentPipeline>)> {
    let store: Arc<dyn VectorStore> = open_store(settings, build_embedder(settings)?)?;
    let llm = build_llm(settings)?;

    let retriever = Arc::new(
        Retriever::new(store, llm.clone())
            .with_k(settings.retrieval_k)
            .with_index_location(settings.persist_directory.display().to_string()),
    );
    let pipeline = Arc::new(AgentPipeline::new(retriever.clone(), llm));
    Ok((retriever, pipeline))
}

async fn ask(settings: &Settings, question: &str, multi_agent: bool, k: Option<usize>) -> Result<()> {
    let (retriever, pipeline) = build_answering(settings)?;
    if let Some(k) = k {
        retriever.set_k(k);
    }

    let started = Instant::now();
    let (mode, result) = if multi_agent {
        (Mode::MultiAgent, pipeline.run(question).await?.into_retrieval())
    } else {
        (Mode::Standard, retriever.qa(question).await?)
    };

    render_answer(&AnswerRecord {
        question: question.to_string(),
        result,
        elapsed: started.elapsed(),
        mode,
        timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
    });
    Ok(())
}

async fn ingest(settings: &Settings, manifest: Option<PathBuf>, rebuild: bool) -> Result<()> {
    let manifest = manifest.unwrap_or_else(|| settings.sources_csv.clone());
    let store: Arc<dyn VectorStore> = open_store(settings, build_embedder(settings)?)?;
    let loader = SourceLoader::new(Arc::new(TimedTextTranscripts::new()?), &settings.raw_transcript_dir)?;
    let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)?;

    let report = Ingestor::new(loader, splitter, store)
        .run(&manifest, rebuild)
        .await
        .with_context(|| format!("ingestion from {} failed", manifest.display()))?;

    println!("{} {}", "✅ Done.".green().bold(), report);
    for failure in &report.failures {
        println!(
            "  {} {} {} | {}",
            "skipped".yellow(),
            failure.kind,
            failure.location,
            failure.reason
        );
    }
    println!("Index written to {}", settings.index_path().display());
    Ok(())
}

async fn validate(settings: &Settings, manifest: Option<PathBuf>) -> Result<()> {
    let manifest = manifest.unwrap_or_else(|| settings.sources_csv.clone());
    let validator = SourceValidator::new(Arc::new(TimedTextTranscripts::new()?), &settings.raw_transcript_dir)?;

    match validator.run(&manifest).await {
        Ok(report) => {
            print!("{}", report.render());
            Ok(())
        }
        Err(Error::Manifest(_)) => {
            println!("{} CSV not found: {}", "[fatal]".red(), manifest.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn health(settings: &Settings) -> Result<()> {
    let store = match build_embedder(settings).and_then(|e| open_store(settings, e)) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(error = %e, "Index unavailable");
            None
        }
    };
    let store_ref = store.as_deref().map(|s| s as &dyn VectorStore);
    let report = HealthReport::collect(settings, store_ref, OpenAIConfig::key_present()).await;
    println!("{}", "Brew portal health".bold());
    println!("{}", report);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to read settings from {}", cli.config.display()))?;

    match cli.command.unwrap_or(Commands::Portal) {
        Commands::Portal => {
            let (retriever, pipeline) = build_answering(&settings)?;
            Portal::new(retriever, pipeline).run().await?;
        }
        Commands::Ask {
            question,
            multi_agent,
            k,
        } => ask(&settings, &question, multi_agent, k).await?,
        Commands::Ingest { manifest, rebuild } => ingest(&settings, manifest, rebuild).await?,
        Commands::Validate { manifest } => validate(&settings, manifest).await?,
        Commands::Health => health(&settings).await?,
    }

    Ok(())
}
