//! # Chat Recall CLI (`recall`)
//!
//! The `recall` binary answers questions from a team's chat history with
//! inline citations, ingests chat exports into the similarity index, and
//! serves the same engine over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! recall --config ./config/recall.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recall ask "<message>"` | Generate a cited answer |
//! | `recall ingest <export.json>` | Embed and index a chat export |
//! | `recall serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Index a chat export into Pinecone
//! recall ingest ./exports/chat.json --config ./config/recall.toml
//!
//! # Ask with a stricter relevance threshold
//! recall ask "What database do we use?" --threshold 0.3
//!
//! # Serve POST /api/chat on the configured bind address
//! recall serve
//! ```

use chat_recall::ask::{run_ask, AskOptions};
use chat_recall::config;
use chat_recall::ingest::{run_ingest, DEFAULT_BATCH_SIZE};
use chat_recall::logging;
use chat_recall::server::run_server;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chat Recall CLI — retrieval-augmented answers with citations to prior
/// chat messages.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Secrets are read from `OPENAI_API_KEY` and `PINECONE_API_KEY`.
#[derive(Parser)]
#[command(
    name = "recall",
    about = "Chat Recall — answers grounded in your chat history, with citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a cited answer to a message.
    ///
    /// Retrieves similar prior messages, keeps those above the relevance
    /// threshold, and asks the configured model to answer with inline
    /// `{ref:N}` markers.
    Ask {
        /// The user message.
        message: String,

        /// Number of similar messages to retrieve (overrides `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum similarity score (overrides `retrieval.similarity_threshold`).
        #[arg(long)]
        threshold: Option<f64>,

        /// Persona or extra instructions appended to the system instruction.
        #[arg(long)]
        persona: Option<String>,

        /// Print the full result (response, citations, references) as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Embed and index every message of a JSON chat export.
    Ingest {
        /// Path to the export file.
        path: PathBuf,

        /// Messages per batch.
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask {
            message,
            top_k,
            threshold,
            persona,
            json,
        } => {
            run_ask(
                &cfg,
                &message,
                AskOptions {
                    top_k,
                    threshold,
                    persona,
                    json,
                },
            )
            .await?;
        }
        Commands::Ingest { path, batch_size } => {
            run_ingest(&cfg, &path, batch_size).await?;
        }
        Commands::Serve => {
            run_server(&cfg).await?;
        }
    }

    Ok(())
}
