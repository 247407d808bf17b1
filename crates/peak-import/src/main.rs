//! P-EAK record import - main entry point

use clap::Parser;
use peak_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use peak_import::{execute, Cli};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // .env may supply DATABASE_URL and LOG_* before clap reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let defaults = LogConfig::builder()
        .level(LogLevel::Info)
        .output(LogOutput::Console)
        .log_file_prefix("peak-import")
        .build();

    // Environment variables override the defaults, --verbose overrides both
    let mut log_config = match defaults.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring LOG_* settings: {}", e);
            defaults
        },
    };
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }

    // The import still runs if logging cannot be set up
    let _guard = init_logging(&log_config)
        .map_err(|e| eprintln!("Warning: logging disabled: {}", e))
        .ok();

    match execute(cli.command).await {
        Ok(summary) => {
            info!("Import complete");
            print!("{}", summary);
        },
        Err(e) => {
            error!(error = %e, "Import failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        },
    }
}
