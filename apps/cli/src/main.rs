//! specmerge CLI: assemble an OpenAPI 3.0 document from definition files.
//!
//! Reads `specmerge.toml`, discovers route and schema files by glob, and
//! writes the merged document.

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
