//! # docqa CLI
//!
//! The `docqa` binary answers questions against a private collection of
//! uploaded PDF documents.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and run schema migrations |
//! | `docqa serve` | Start the JSON HTTP server |
//! | `docqa ingest <file.pdf>` | Ingest a PDF from the local filesystem |
//! | `docqa ask "<question>"` | Answer a question against the corpus |
//! | `docqa search "<query>"` | Rank documents by relevance without answering |
//! | `docqa stats` | Show corpus counters |
//! | `docqa flush` | Delete all documents, chunks, and stored files |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use docqa::answer::Language;
use docqa::blob::{BlobStore, FsBlobStore};
use docqa::config::{load_config, Config};
use docqa::llm::create_generator;
use docqa::service::RagService;
use docqa::store::sqlite::SqliteStore;
use docqa::store::Store;

/// docqa — retrieval-grounded question answering over private PDF
/// collections.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Retrieval-grounded question answering over private PDF collections",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Idempotent.
    Init,

    /// Start the JSON HTTP server.
    Serve,

    /// Ingest a PDF file into the corpus.
    Ingest {
        /// Path to the PDF file.
        file: PathBuf,
    },

    /// Answer a question against the corpus.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Rank documents by relevance to a query without generating an answer.
    Search {
        /// The search query.
        query: String,
    },

    /// Show corpus counters.
    Stats,

    /// Delete all documents, chunks, queries, sessions, and stored files.
    Flush,
}

async fn build_app(cfg: &Config) -> anyhow::Result<(Arc<RagService>, Arc<dyn Store>, Arc<dyn BlobStore>)> {
    let pool = docqa::db::connect(cfg).await?;
    docqa::migrate::run_migrations(&pool).await?;

    let language = Language::parse(&cfg.app.language)
        .ok_or_else(|| anyhow::anyhow!("unsupported app language: {}", cfg.app.language))?;

    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(cfg.blob.root.clone()));
    let generator = Arc::from(create_generator(&cfg.llm, language)?);

    let service = Arc::new(RagService::new(
        store.clone(),
        blobs.clone(),
        generator,
        cfg.chunking.clone(),
        cfg.retrieval.clone(),
        language,
    ));
    Ok((service, store, blobs))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = docqa::db::connect(&cfg).await?;
            docqa::migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            let (service, store, blobs) = build_app(&cfg).await?;
            docqa::server::run_server(&cfg, service, store, blobs).await?;
        }
        Commands::Ingest { file } => {
            let (service, _, _) = build_app(&cfg).await?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.pdf")
                .to_string();
            let bytes = std::fs::read(&file)?;
            match service.ingest(&filename, &bytes).await {
                Ok(doc) => {
                    println!("Ingested {} ({} chunks)", doc.original_filename, doc.chunk_count);
                    println!("  id: {}", doc.id);
                }
                Err(e) => {
                    anyhow::bail!("ingestion failed: {}", e);
                }
            }
        }
        Commands::Ask { question } => {
            let (service, _, _) = build_app(&cfg).await?;
            let result = service.query(&question).await?;
            println!("{}", result.answer);
            println!();
            println!("confidence: {:.2}", result.confidence);
            if !result.sources.is_empty() {
                println!("sources:");
                for source in &result.sources {
                    println!("  {}", source);
                }
            }
        }
        Commands::Search { query } => {
            let (service, _, _) = build_app(&cfg).await?;
            let sources = service.search_sources(&query).await?;
            if sources.is_empty() {
                println!("No matching documents.");
            }
            for source in sources {
                println!("{:>8.2}  {}  ({})", source.score, source.filename, source.document_id);
            }
        }
        Commands::Stats => {
            let (service, _, _) = build_app(&cfg).await?;
            let stats = service.stats().await?;
            println!("documents: {}", stats.total_documents);
            println!("completed: {}", stats.completed_documents);
            println!("chunks:    {}", stats.total_chunks);
        }
        Commands::Flush => {
            let (service, _, _) = build_app(&cfg).await?;
            service.flush().await?;
            println!("Corpus flushed.");
        }
    }

    Ok(())
}
