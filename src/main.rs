//! Miami Housing - Main Entry Point
//!
//! Trains, queries and explains the sale price model from the command line.

use clap::Parser;
use miami_housing::cli::Cli;
use miami_housing::config::HousingConfig;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "miami_housing=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = HousingConfig::from_env()?;
    cli.run(&config)
}
