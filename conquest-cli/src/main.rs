//! CONQUEST CLI - Command-line interface
//!
//! Commands:
//! - evolve: Run the genetic algorithm over strategy genes
//! - play: Play a single match between chosen genes
//! - map: Validate a map and print its summary

mod evolve;
mod map;
mod play;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "conquest")]
#[command(about = "CONQUEST territory-strategy evolution")]
struct Cli {
    /// Seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Custom map JSON file (defaults to the standard 42-territory board)
    #[arg(long, global = true, value_name = "FILE")]
    map: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve strategy genes
    Evolve(evolve::EvolveArgs),
    /// Play a single match
    Play(play::PlayArgs),
    /// Validate a map and print its summary
    Map,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let topology = map::load_topology(cli.map.as_deref())?;

    match cli.command {
        Commands::Evolve(args) => evolve::run(args, topology, cli.seed),
        Commands::Play(args) => play::run(args, topology, cli.seed),
        Commands::Map => map::run(&topology),
    }
}
