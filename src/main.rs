//! # lexindex CLI (`lex`)
//!
//! ## Usage
//!
//! ```bash
//! lex --config ./config/lex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lex serve` | Start the HTTP retrieval server |
//! | `lex search "<query>" --dir <dir>` | Index a directory and run one query |
//! | `lex chunk <file>` | Show how a file would be chunked |
//!
//! ## Examples
//!
//! ```bash
//! # Serve, preloading a folder of case law, statutes, contracts and memos
//! lex serve --preload ./corpus
//!
//! # One-shot search printing the generator context block
//! lex search "implied warranty of habitability" --dir ./corpus -k 4 --context
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` (e.g. `RUST_LOG=lexindex=debug`) to
//! adjust verbosity.

use clap::{Parser, Subcommand};
use lexindex::config;
use lexindex::search::SearchOptions;
use lexindex_core::DocType;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// lexindex: chunk, embed and search legal documents.
#[derive(Parser)]
#[command(
    name = "lex",
    about = "lexindex: chunk, embed and search legal documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lex.toml`; built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/lex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP retrieval server on `[server].bind`.
    Serve {
        /// Ingest every .txt/.md file under this directory before serving.
        #[arg(long)]
        preload: Option<PathBuf>,
    },

    /// Index a directory in memory and run a single query against it.
    Search {
        query: String,

        /// Directory of .txt/.md documents to index.
        #[arg(long)]
        dir: PathBuf,

        /// Maximum number of results (default: `[retrieval].default_k`).
        #[arg(short = 'k', long)]
        k: Option<usize>,

        /// Minimum similarity, exclusive (default: `[retrieval].relevance_threshold`).
        #[arg(long)]
        threshold: Option<f32>,

        /// Type for files whose directory names none
        /// (case-law, statute, contract, memo).
        #[arg(long)]
        doc_type: Option<DocType>,

        /// Print the context block instead of the ranked list.
        #[arg(long)]
        context: bool,
    },

    /// Print the chunks a file would be split into.
    Chunk { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve { preload } => {
            lexindex::server::run_server(&cfg, preload.as_deref()).await?;
        }
        Commands::Search {
            query,
            dir,
            k,
            threshold,
            doc_type,
            context,
        } => {
            let opts = SearchOptions {
                k,
                threshold,
                doc_type,
                context,
            };
            lexindex::search::run_search(&cfg, &dir, &query, &opts).await?;
        }
        Commands::Chunk { file } => {
            lexindex::chunk::run_chunk(&cfg, &file)?;
        }
    }

    Ok(())
}
