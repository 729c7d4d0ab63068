//! # askdocs CLI
//!
//! The `askdocs` binary drives the whole pipeline: building the database
//! from a scraped corpus, answering questions against it, and running the
//! Telegram chat front end.
//!
//! ## Usage
//!
//! ```bash
//! askdocs --config ./config/askdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs init` | Create the SQLite database and tables |
//! | `askdocs scrape` | Load corpus text files into the scraped table |
//! | `askdocs index` | Chunk, embed, and store the retrieval table |
//! | `askdocs ask "<question>"` | Answer a question from retrieved context |
//! | `askdocs context "<question>"` | Print the context that would be sent |
//! | `askdocs stats` | Show document, chunk, and model information |
//! | `askdocs export` | Dump the retrieval table as JSON |
//! | `askdocs bot` | Run the Telegram bot |

use askdocs::ask::{self, AskArgs};
use askdocs::{config, export, index, logging, migrate, stats, telegram};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// askdocs: question answering over a scraped documentation corpus.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/askdocs.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "Retrieval-augmented question answering over a documentation corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdocs.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the scraped, chunks, and
    /// table_meta tables. Safe to run more than once.
    Init,

    /// Load the corpus directory into the scraped table.
    ///
    /// Replaces any previously scraped pages.
    Scrape,

    /// Chunk and embed the scraped pages into the retrieval table.
    ///
    /// Requires OPENAI_API_KEY. Any embedding failure aborts the run and
    /// leaves the previous table in place.
    Index {
        /// Maximum embedding requests in flight (overrides config).
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Answer a question from the retrieval table.
    Ask {
        /// The question to answer.
        question: String,

        /// Completion model (overrides config).
        #[arg(long)]
        model: Option<String>,

        /// Context budget in tokens (overrides config).
        #[arg(long)]
        max_len: Option<usize>,

        /// Maximum tokens in the answer (overrides config).
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Stop sequence for the completion.
        #[arg(long)]
        stop: Option<String>,

        /// Log the assembled context and request parameters.
        #[arg(long)]
        debug: bool,
    },

    /// Print the context assembled for a question, without answering.
    Context {
        question: String,

        /// Context budget in tokens (overrides config).
        #[arg(long)]
        max_len: Option<usize>,
    },

    /// Show database statistics.
    Stats,

    /// Export the retrieval table as JSON.
    Export {
        /// Output file path. Defaults to stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Run the Telegram bot (requires TG_BOT_TOKEN and OPENAI_API_KEY).
    Bot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Scrape => {
            index::run_scrape(&cfg).await?;
        }
        Commands::Index { concurrency } => {
            index::run_index(&cfg, concurrency).await?;
        }
        Commands::Ask {
            question,
            model,
            max_len,
            max_tokens,
            stop,
            debug,
        } => {
            let args = AskArgs {
                model,
                max_len,
                max_tokens,
                stop,
                debug,
            };
            if let Err(e) = ask::run_ask(&cfg, &question, &args).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Context { question, max_len } => {
            if let Err(e) = ask::run_context(&cfg, &question, max_len).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Bot => {
            telegram::run_bot(&cfg).await?;
        }
    }

    Ok(())
}
