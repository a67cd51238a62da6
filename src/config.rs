//! Configuration and CLI argument handling

use std::path::PathBuf;
use clap::Parser;

use crate::state::StopPolicy;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "stopwatch-registry")]
#[command(about = "An HTTP service that manages concurrent stopwatch timers")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "3001")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// JSON file to persist timers to; timers live in memory only when omitted
    #[arg(short, long)]
    pub data_file: Option<PathBuf>,

    /// Reject stopping an already stopped timer instead of returning it unchanged
    #[arg(long)]
    pub strict_stop: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn stop_policy(&self) -> StopPolicy {
        if self.strict_stop { StopPolicy::Strict } else { StopPolicy::Idempotent }
    }
}
