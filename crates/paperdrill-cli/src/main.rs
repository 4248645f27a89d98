//! paperdrill CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "paperdrill", version, about = "Spaced-repetition quiz tool for your paper notes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull papers from the Notion database into the local cache
    Sync {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List papers ranked by review priority
    List {
        /// Only show papers whose status is Due
        #[arg(long)]
        due_only: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run an interactive quiz session
    Study {
        /// Pick a paper by id or title substring (default: highest priority)
        #[arg(long)]
        paper: Option<String>,

        /// Questions to generate (default: from config)
        #[arg(long)]
        questions: Option<usize>,

        /// Model to use (e.g. "anthropic/claude-sonnet-4-20250514")
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show aggregate study statistics
    Stats {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show recent quiz sessions
    History {
        /// Max sessions to show
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Clear all review statistics
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("paperdrill=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync { config } => commands::sync::execute(config).await,
        Commands::List { due_only, config } => commands::list::execute(due_only, config),
        Commands::Study {
            paper,
            questions,
            model,
            config,
        } => commands::study::execute(paper, questions, model, config).await,
        Commands::Stats { config } => commands::stats::execute(config),
        Commands::History { limit, config } => commands::history::execute(limit, config),
        Commands::Reset { yes, config } => commands::reset::execute(yes, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
