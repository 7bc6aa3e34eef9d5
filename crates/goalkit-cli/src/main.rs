mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, track::TrackSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "goalkit",
    about = "Project health and execution reporting for goal-driven projects",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .goalkit/ or .git/)
    #[arg(long, global = true, env = "GOALKIT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score project health and detect its phase from the goal documents
    Analyze {
        /// Include the weighted health breakdown
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Record milestone completions and show execution velocity
    Track {
        #[command(subcommand)]
        subcommand: TrackSubcommand,
    },

    /// Inspect the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Analyze { verbose } => cmd::analyze::run(&root, verbose, cli.json),
        Commands::Track { subcommand } => cmd::track::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
