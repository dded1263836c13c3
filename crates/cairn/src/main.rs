//! Cairn - Declarative capability workflow orchestrator
//!
//! Main entry point for the Cairn CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{catalog, run, validate};

/// Cairn - declarative capability workflow orchestrator
#[derive(Parser)]
#[command(name = "cairn")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow document
    Run(run::RunArgs),

    /// Validate a workflow document without executing it
    Validate(validate::ValidateArgs),

    /// Inspect a capability catalog
    Catalog(catalog::CatalogArgs),
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Validate(args) => validate::execute(args),
        Commands::Catalog(args) => catalog::execute(args),
    }
}
