//! CLI parse: clap types for pagewright. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pagewright CLI - progressive page generation
#[derive(Parser)]
#[command(name = "pagewright")]
#[command(about = "Generate a page layout and fill every section as soon as it is planned")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory whose config/ folder holds workspace configuration
    #[arg(long, default_value = ".")]
    pub config_root: PathBuf,

    /// Configuration file path (overrides layered config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a page for a topic with the configured provider
    Generate {
        /// What the page is about
        topic: String,
        /// Give up waiting for unfinished streams after this many seconds
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Disable colored text output
        #[arg(long)]
        no_color: bool,
    },
    /// Parse layout markup from a file (or - for stdin) and print it as JSON
    Parse {
        /// Markup file path, or - to read stdin
        input: String,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}
