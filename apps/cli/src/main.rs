//! Categorizer CLI: classify businesses into industry verticals from their websites.
//!
//! Classifies a single business interactively, or a CSV of customers in
//! batch, using a hosted generation service.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
