//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.feedpulse.toml` files.

use crate::analysis::SocialSettings;
use crate::cli::OutputFormat;
use crate::fetch::FetcherConfig;
use crate::models::NumberKind;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".feedpulse.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Remote endpoint settings.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Sliding window settings.
    #[serde(default)]
    pub window: WindowConfig,

    /// Social aggregation settings.
    #[serde(default)]
    pub social: SocialConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Maximum concurrent sub-fetches per fan-out stage.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Remote endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for numeric fetches, in milliseconds.
    #[serde(default = "default_numbers_timeout")]
    pub numbers_timeout_ms: u64,

    /// Timeout for users, posts and comments fetches, in milliseconds.
    #[serde(default = "default_social_timeout")]
    pub social_timeout_ms: u64,

    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            numbers_timeout_ms: default_numbers_timeout(),
            social_timeout_ms: default_social_timeout(),
            auth_token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://20.244.56.144/test".to_string()
}

fn default_numbers_timeout() -> u64 {
    500
}

fn default_social_timeout() -> u64 {
    5000
}

/// Sliding window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Number of unique observations retained.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Which numbers endpoint to poll.
    #[serde(default)]
    pub number_kind: NumberKind,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            number_kind: NumberKind::default(),
        }
    }
}

fn default_capacity() -> usize {
    crate::analysis::DEFAULT_CAPACITY
}

/// Social aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// Length of the top-users and trending-posts views.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Maximum feed entries rendered. The aggregated feed itself is never cut.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_limit: Option<usize>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.feedpulse.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.endpoint.base_url = base_url.clone();
        }
        if let Some(ref token) = args.token {
            self.endpoint.auth_token = Some(token.clone());
        }
        if let Some(timeout) = args.timeout_ms {
            self.endpoint.numbers_timeout_ms = timeout;
            self.endpoint.social_timeout_ms = timeout;
        }

        if let Some(kind) = args.kind {
            self.window.number_kind = kind;
        }
        if let Some(capacity) = args.window_size {
            self.window.capacity = capacity;
        }

        if let Some(top_k) = args.top_k {
            self.social.top_k = top_k;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check that the merged settings are usable.
    pub fn validate(&self) -> Result<()> {
        let url = &self.endpoint.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Base URL must start with 'http://' or 'https://'");
        }
        if self.endpoint.numbers_timeout_ms == 0 || self.endpoint.social_timeout_ms == 0 {
            bail!("Timeouts must be at least 1 millisecond");
        }
        if self.window.capacity == 0 {
            bail!("Window capacity must be at least 1");
        }
        if self.social.top_k == 0 {
            bail!("Top-k must be at least 1");
        }
        if self.general.concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }
        Ok(())
    }

    /// Settings for the HTTP fetcher.
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            base_url: self.endpoint.base_url.clone(),
            numbers_timeout: Duration::from_millis(self.endpoint.numbers_timeout_ms),
            social_timeout: Duration::from_millis(self.endpoint.social_timeout_ms),
            auth_token: self.endpoint.auth_token.clone(),
        }
    }

    /// Settings for the social aggregator.
    pub fn social_settings(&self) -> SocialSettings {
        SocialSettings {
            top_k: self.social.top_k,
            concurrency: self.general.concurrency,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Source};
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.capacity, 10);
        assert_eq!(config.social.top_k, 5);
        assert_eq!(config.endpoint.numbers_timeout_ms, 500);
        assert_eq!(config.window.number_kind, NumberKind::Even);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
concurrency = 8

[endpoint]
base_url = "https://example.test/api"
auth_token = "abc"

[window]
capacity = 20
number_kind = "primes"

[report]
format = "json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.concurrency, 8);
        assert_eq!(config.endpoint.base_url, "https://example.test/api");
        assert_eq!(config.endpoint.auth_token.as_deref(), Some("abc"));
        assert_eq!(config.endpoint.social_timeout_ms, 5000);
        assert_eq!(config.window.capacity, 20);
        assert_eq!(config.window.number_kind, NumberKind::Primes);
        assert_eq!(config.social.top_k, 5);
        assert_eq!(config.report.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[social]\ntop_k = 3\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.social.top_k, 3);

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[social\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.window.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.endpoint.base_url = "ftp://nope".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.general.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.endpoint.numbers_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::parse_from([
            "feedpulse",
            "numbers",
            "--window-size",
            "4",
            "--kind",
            "fibo",
            "--timeout-ms",
            "900",
        ]);
        assert_eq!(args.source, Some(Source::Numbers));

        let mut config = Config::default();
        config.social.top_k = 7;
        config.merge_with_args(&args);

        assert_eq!(config.window.capacity, 4);
        assert_eq!(config.window.number_kind, NumberKind::Fibo);
        assert_eq!(config.endpoint.numbers_timeout_ms, 900);
        assert_eq!(config.endpoint.social_timeout_ms, 900);
        // Not given on the command line
        assert_eq!(config.social.top_k, 7);
        assert_eq!(config.fetcher_config().numbers_timeout, Duration::from_millis(900));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[endpoint]"));
        assert!(toml_str.contains("[window]"));
        assert!(toml_str.contains("[social]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.window.capacity, 10);
    }
}
