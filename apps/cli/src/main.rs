//! Compositor CLI: render composite catalog templates.
//!
//! Reads a catalog configuration and a composite configuration (local paths
//! or HTTP(S) URLs) and dispatches each component to its catalog's builder.

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
