//! AMC CLI - builds Monte Carlo exposure cubes from a run configuration
//!
//! # Commands
//!
//! - `amc run` - Build the cube for the demo portfolio and print an
//!   exposure summary per trade
//! - `amc check` - Validate the configuration and print the simulation grid
//!
//! # Architecture
//!
//! As part of the **S**ervice layer this crate wires the model, grid and
//! engine crates together; only the binary installs a tracing subscriber.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod portfolio;

/// AMC exposure cube runner
#[derive(Parser)]
#[command(name = "amc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config/amc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the exposure cube for the demo portfolio
    Run {
        /// Number of Monte Carlo samples (overrides the configuration)
        #[arg(short, long)]
        samples: Option<usize>,

        /// Random seed (overrides the configuration)
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (table, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Validate the configuration and print the simulation grid
    Check,
}

fn main() -> Result<()> {
    // Initialise tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Run {
            samples,
            seed,
            format,
        } => commands::run::run(&cli.config, samples, seed, &format),
        Commands::Check => commands::check::run(&cli.config),
    }
}
