//! Pagewright CLI Binary
//!
//! Command-line interface for progressive page generation.

use clap::Parser;
use pagewright::cli::{Cli, RunContext};
use pagewright::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let context = match RunContext::new(cli.config_root.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let logging_config = build_logging_config(&cli, context.config().logging.clone());
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Pagewright CLI starting");

    match context.execute(&cli.command).await {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

/// Apply CLI flags on top of the configured logging section.
fn build_logging_config(cli: &Cli, mut config: LoggingConfig) -> LoggingConfig {
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    config
}
