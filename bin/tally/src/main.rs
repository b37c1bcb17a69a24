//! Tally score tracker binary.

mod cli;
mod commands;
mod config;
mod launch;

use clap::Parser;
use tally_observability::init_logging;
use tracing::info;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli.logs)?;

    info!("Starting tally {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Config(args) => commands::show_config(&args),
        Commands::Replay(args) => commands::replay::run(args).await,
    }
}
