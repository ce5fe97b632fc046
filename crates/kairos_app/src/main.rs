mod cli;
mod commands;
mod config;
mod console;
mod export;
mod persist;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kairos_client::SessionError;
use kairos_logging::{LogDestination, DEFAULT_LOG_FILE};
use log::LevelFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let log_file = PathBuf::from(DEFAULT_LOG_FILE);
    if cli.verbose {
        kairos_logging::initialize(LogDestination::Both(log_file), LevelFilter::Debug);
    } else {
        kairos_logging::initialize(LogDestination::File(log_file), LevelFilter::Info);
    }

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Session failures were already shown as notifications.
            if err.downcast_ref::<SessionError>().is_none() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
