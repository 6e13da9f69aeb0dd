//! # Knowledge Assistant CLI (`ka`)
//!
//! Commands for building the document index and querying it.
//!
//! ```bash
//! ka --config ./config/ka.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ka ingest --path <p>` | Chunk, embed, and index a file or directory |
//! | `ka query "<question>"` | Retrieve passages and generate an answer |
//! | `ka serve` | Start the HTTP server (`POST /query`, `GET /health`) |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use knowledge_assistant::{app, config, ingest, query, server};

/// Knowledge Assistant — retrieve the most relevant passages of your
/// documents for a question, with optional answer generation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; every setting has a workable default, so the flag is optional.
#[derive(Parser)]
#[command(
    name = "ka",
    about = "Knowledge Assistant — chunk, embed, index, and query personal document collections",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ka.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files: load → chunk → embed → index → save.
    ///
    /// Accepts a single file or a directory (scanned recursively for
    /// .pdf, .docx, .pptx, .txt, .md). Appends to an existing index
    /// unless --fresh is given.
    Ingest {
        /// File or directory to ingest.
        #[arg(long)]
        path: PathBuf,

        /// Index file destination (overrides `[index].path`).
        #[arg(long)]
        index: Option<PathBuf>,

        /// Chunk size in characters (overrides `[chunking].max_chars`).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Chunk overlap in characters (overrides `[chunking].overlap`).
        #[arg(long)]
        chunk_overlap: Option<usize>,

        /// Do not load an existing index; start new.
        #[arg(long)]
        fresh: bool,

        /// Optional: test a query against the built index.
        #[arg(long)]
        query: Option<String>,

        /// Top-k results for --query.
        #[arg(long, default_value_t = 5)]
        k: usize,
    },

    /// Query the index from the terminal.
    Query {
        /// The question to ask.
        question: String,

        /// Number of passages to retrieve (defaults to `[server].default_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest {
            path,
            index,
            chunk_size,
            chunk_overlap,
            fresh,
            query,
            k,
        } => {
            ingest::run_ingest(&cfg, &path, index, chunk_size, chunk_overlap, fresh, query, k)
                .await?;
        }
        Commands::Query { question, k } => {
            let k = k.unwrap_or(cfg.server.default_k);
            let ctx = app::AppContext::initialize(cfg)?;
            query::run_query(&ctx, &question, k).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
