//! twcal: Taiwan government office calendar ingestion tool.
//!
//! Downloads the published office calendars and rewrites them as monthly
//! and yearly JSON documents with an index.

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
