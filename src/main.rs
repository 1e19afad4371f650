//! # repochat CLI
//!
//! The `repochat` binary summarizes every file of a local repository with a
//! language model and answers questions about the codebase from those
//! summaries.
//!
//! ## Usage
//!
//! ```bash
//! repochat --config ./config/repochat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `repochat init` | Create the SQLite database and schema |
//! | `repochat ingest <dir>` | Start a session for `<dir>` and summarize its files |
//! | `repochat ask "<query>"` | Answer a question about the latest (or given) session |
//! | `repochat chat <dir>` | Ingest, then answer questions read from stdin |
//! | `repochat summaries` | Show the stored summaries of a session |
//! | `repochat transcript` | Print the stored chat transcript of a session |
//! | `repochat sessions` | List sessions with summary counts |
//!
//! ## Examples
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! repochat init
//! repochat ingest ~/src/my-project
//! repochat ask "What is this repo about?"
//! repochat ask "How many files are there?" --session repo-0b6c...
//! ```

mod assistant;
mod chat;
mod completion;
mod config;
mod db;
mod error;
mod filter;
mod ingest;
mod migrate;
mod models;
mod progress;
mod prompt;
mod query;
mod session;
mod source;
mod stats;
mod store;
mod transcript;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// repochat: ask questions about a local codebase.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "repochat",
    about = "repochat: summarize a repository with an LLM and chat about it",
    version,
    long_about = "repochat walks a local repository, asks a language model for a short summary \
    of every file, stores the summaries in SQLite, and answers questions about the codebase \
    using those summaries as context."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/repochat.toml`.
    #[arg(long, global = true, default_value = "./config/repochat.toml")]
    config: PathBuf,

    /// Verbose logging (debug level for repochat).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keep everything in memory; nothing is read from or written to disk.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and its tables. Idempotent.
    Init,

    /// Start a new session for a directory and summarize every file.
    ///
    /// Files under node_modules, .git, .vscode, dist and build, plus
    /// `*.log` and `*.lock` files, are skipped.
    Ingest {
        /// Repository root.
        dir: PathBuf,

        /// Progress output on stderr: `human`, `json`, or `off`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Ask a question about an ingested repository.
    Ask {
        /// The question.
        query: String,

        /// Session id (defaults to the most recent session).
        #[arg(long)]
        session: Option<String>,
    },

    /// Ingest a directory, then answer questions read from stdin.
    Chat {
        /// Repository root.
        dir: PathBuf,

        /// Progress output on stderr: `human`, `json`, or `off`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Show the stored summaries of a session.
    Summaries {
        /// Session id (defaults to the most recent session).
        #[arg(long)]
        session: Option<String>,
    },

    /// Print the stored chat transcript of a session.
    Transcript {
        /// Session id (defaults to the most recent session).
        #[arg(long)]
        session: Option<String>,
    },

    /// List sessions with their summary counts.
    #[command(alias = "stats")]
    Sessions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "repochat=debug,info"
    } else {
        "repochat=info,warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            dir,
            progress: progress_arg,
        } => {
            let mode = progress::ProgressMode::parse(progress_arg.as_deref())?;
            chat::run_ingest(&cfg, &dir, mode, cli.ephemeral).await?;
        }
        Commands::Ask { query, session } => {
            chat::run_ask(&cfg, &query, session.as_deref(), cli.ephemeral).await?;
        }
        Commands::Chat {
            dir,
            progress: progress_arg,
        } => {
            let mode = progress::ProgressMode::parse(progress_arg.as_deref())?;
            chat::run_chat(&cfg, &dir, mode, cli.ephemeral).await?;
        }
        Commands::Summaries { session } => {
            chat::run_summaries(&cfg, session.as_deref(), cli.ephemeral).await?;
        }
        Commands::Transcript { session } => {
            transcript::run_transcript(&cfg, session.as_deref(), cli.ephemeral).await?;
        }
        Commands::Sessions => {
            stats::run_stats(&cfg, cli.ephemeral).await?;
        }
    }

    Ok(())
}
