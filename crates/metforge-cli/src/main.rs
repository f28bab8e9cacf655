//! Metforge CLI
//!
//! Assembles bulletin pipelines from YAML documents and runs them over a
//! directory of TAC files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod commands;
mod components;
mod pipeline;
mod project;
mod reader;
mod settings;

/// Metforge - weather bulletin pipelines
#[derive(Parser)]
#[command(name = "metforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pipeline document path
    #[arg(short, long, default_value = "metforge.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the pipeline without running it
    Validate,

    /// Print the materialized settings
    Show,

    /// List built-in components and their options
    Schemas,

    /// Process every bulletin file in the input directory
    Run {
        /// Override the configured worker count
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Show => {
            commands::show::run(&cli.config).await?;
        }
        Commands::Schemas => {
            commands::schemas::run().await?;
        }
        Commands::Run { workers } => {
            commands::run::run(&cli.config, workers).await?;
        }
    }

    Ok(())
}
