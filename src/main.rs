//! `dmuncle` entry point.
//!
//! - `watch` - extract resolved dependencies from a build into `dmuncle-package.json`
//! - `send` - deliver that document to the collector

use clap::Parser;
use dmuncle_harvester::cli::Cli;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.init_logging();

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
