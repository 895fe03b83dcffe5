//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::NumberKind;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// FeedPulse - sliding-window and social feed aggregation
///
/// Polls a numbers endpoint into a bounded, deduplicated window, or fans
/// out over users, posts and comments to rank top users, trending posts
/// and a newest-first feed.
///
/// Examples:
///   feedpulse numbers --kind primes --rounds 5
///   feedpulse social --top-k 10 --format json --output views.json
///   feedpulse social --base-url http://localhost:9876/test --token "$TOKEN"
///   feedpulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Which pipeline to run
    #[arg(value_enum, required_unless_present = "init_config")]
    pub source: Option<Source>,

    /// Base URL of the remote endpoints
    #[arg(long, value_name = "URL", env = "FEEDPULSE_BASE_URL")]
    pub base_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, value_name = "TOKEN", env = "FEEDPULSE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Numbers endpoint to poll (numbers source only)
    #[arg(short, long, value_enum, value_name = "KIND")]
    pub kind: Option<NumberKind>,

    /// Number of fetch-and-merge rounds (numbers source only)
    #[arg(long, default_value = "1", value_name = "COUNT")]
    pub rounds: usize,

    /// Pause between rounds in milliseconds
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub interval_ms: u64,

    /// Window capacity
    #[arg(short = 'w', long, value_name = "SIZE")]
    pub window_size: Option<usize>,

    /// Length of the top-users and trending-posts views
    #[arg(long, value_name = "K")]
    pub top_k: Option<usize>,

    /// Maximum concurrent sub-fetches per fan-out stage
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Per-request timeout in milliseconds (all endpoints)
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Output format (markdown, json)
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .feedpulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .feedpulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Pipeline selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Source {
    /// Sliding window over a numbers endpoint
    Numbers,
    /// Top users, trending posts and feed
    Social,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.rounds == 0 {
            return Err("Rounds must be at least 1".to_string());
        }

        if self.window_size == Some(0) {
            return Err("Window size must be at least 1".to_string());
        }

        if self.top_k == Some(0) {
            return Err("Top-k must be at least 1".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout_ms == Some(0) {
            return Err("Timeout must be at least 1 millisecond".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `[general] verbose` from the config file;
    /// `--quiet` still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            source: Some(Source::Social),
            base_url: None,
            token: None,
            kind: None,
            rounds: 1,
            interval_ms: 1000,
            window_size: None,
            top_k: None,
            concurrency: None,
            timeout_ms: None,
            format: None,
            output: None,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_numbers_source() {
        let args = Args::parse_from(["feedpulse", "numbers", "--kind", "primes", "--rounds", "3"]);
        assert_eq!(args.source, Some(Source::Numbers));
        assert_eq!(args.kind, Some(NumberKind::Primes));
        assert_eq!(args.rounds, 3);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_init_config_needs_no_source() {
        let args = Args::parse_from(["feedpulse", "--init-config"]);
        assert!(args.source.is_none());
        assert!(args.init_config);
        assert!(Args::try_parse_from(["feedpulse"]).is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.base_url = Some("localhost:8080".to_string());
        assert!(args.validate().is_err());

        args.base_url = Some("https://example.test".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_values() {
        let mut args = make_args();
        args.window_size = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.rounds = 0;
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.top_k = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
