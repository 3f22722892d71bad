mod analysis;
mod cli;
mod config;
mod error;
mod model;
mod output;
mod report;
mod sources;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting JobLens - CI Job Correlation Tool");
    cli.execute().await?;

    Ok(())
}
