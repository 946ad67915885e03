//! sfumato CLI - diagnostics for the sfumato diffusion sampling core.

mod commands;
mod synthetic;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sfumato")]
#[command(author, version, about = "sfumato diffusion sampling CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sigma and timestep schedule for a sampler
    Schedule(commands::schedule::ScheduleArgs),

    /// Print the tile plan for a tiled VAE decode
    Tiles(commands::tiles::TilesArgs),

    /// Run the full sampling and decode loop with synthetic models
    Simulate(commands::simulate::SimulateArgs),

    /// Create, show, and validate settings files
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schedule(args) => commands::schedule::run(args),
        Commands::Tiles(args) => commands::tiles::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
