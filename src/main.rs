//! Marcus - Discord voice bot.
//!
//! Binary entry point: logging, then the CLI.

use clap::Parser;
use std::process::ExitCode;

use marcus::Commands;

#[tokio::main]
async fn main() -> ExitCode {
    // The guard flushes the file appender on drop.
    let _log_guard = match marcus::logging::init() {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args = Commands::parse();

    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
