//! FeedPulse - sliding-window and social feed aggregation
//!
//! A CLI tool that fetches numeric and social data from unreliable HTTP
//! endpoints and reports a deduplicated sliding window with its average,
//! or ranked top users, trending posts and a newest-first feed.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, connection, users fetch failure, etc.)

mod analysis;
mod cli;
mod config;
mod fetch;
mod models;
mod report;

use analysis::{SocialAggregator, WindowAggregator};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat, Source};
use config::{Config, DEFAULT_CONFIG_FILE};
use fetch::HttpFetcher;
use indicatif::{ProgressBar, ProgressStyle};
use models::{ReportMetadata, SocialReport, WindowReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load config before logging so [general] verbose can raise the level
    let loaded = load_config(&args);
    let config_verbose = loaded
        .as_ref()
        .is_ok_and(|(config, _)| config.general.verbose);

    // Initialize logging
    init_logging(args.log_level(config_verbose));

    info!("FeedPulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, loaded).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .feedpulse.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize endpoint, window size, top-k, and more.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the selected pipeline. Returns the exit code.
async fn run(args: Args, loaded: Result<(Config, ConfigOrigin)>) -> Result<i32> {
    let (mut config, origin) = loaded?;
    origin.log();
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let fetcher = Arc::new(HttpFetcher::new(config.fetcher_config())?);
    info!("Using endpoint {}", config.endpoint.base_url);

    match args.source {
        Some(Source::Numbers) => run_numbers(&args, &config, fetcher).await,
        Some(Source::Social) => run_social(&args, &config, fetcher).await,
        None => anyhow::bail!("No source selected"),
    }
}

/// Poll the numbers endpoint for the requested rounds and report the window.
async fn run_numbers(args: &Args, config: &Config, fetcher: Arc<HttpFetcher>) -> Result<i32> {
    let start_time = Instant::now();
    let kind = config.window.number_kind;
    let aggregator = WindowAggregator::new(config.window.capacity);

    for round in 1..=args.rounds {
        let window = aggregator.refresh(fetcher.as_ref(), kind).await;
        info!(
            "Round {}/{}: window {:?}, average {:.2}",
            round,
            args.rounds,
            window.values(),
            window.average()
        );

        if round < args.rounds {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
    }

    let report = WindowReport {
        metadata: metadata(config, start_time),
        number_kind: kind,
        capacity: aggregator.capacity(),
        latest: aggregator.last_received(),
        previous: aggregator.previous_window().values().to_vec(),
        current: aggregator.current_window().values().to_vec(),
        average: aggregator.current_average(),
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_window_markdown(&report),
    };
    emit(args, &output)?;

    Ok(0)
}

/// Run one social fetch cycle and report the published views.
async fn run_social(args: &Args, config: &Config, fetcher: Arc<HttpFetcher>) -> Result<i32> {
    let start_time = Instant::now();
    let aggregator = SocialAggregator::new(fetcher, config.social_settings());

    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Fetching users, posts and comments...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let outcome = aggregator.run().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    debug!("Social aggregator is {}", aggregator.phase());

    let (error, exit_code) = match outcome {
        Ok(views) => {
            if let Some(ref stats) = views.stats {
                info!(
                    "Cycle complete: {} users, {} posts ({} post and {} comment fetches failed)",
                    stats.users,
                    stats.posts,
                    stats.failed_post_fetches,
                    stats.failed_comment_fetches
                );
            }
            (None, 0)
        }
        Err(e) => {
            error!("Social cycle aborted: {}; reporting last published views", e);
            (Some(e.to_string()), 1)
        }
    };

    let report = SocialReport {
        metadata: metadata(config, start_time),
        views: models::SocialViews::clone(&aggregator.snapshot()),
        error,
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_social_markdown(&report, config.report.feed_limit),
    };
    emit(args, &output)?;

    Ok(exit_code)
}

fn metadata(config: &Config, start_time: Instant) -> ReportMetadata {
    ReportMetadata {
        base_url: config.endpoint.base_url.clone(),
        generated_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    }
}

/// Write the rendered report to --output or stdout.
fn emit(args: &Args, output: &str) -> Result<()> {
    match args.output {
        Some(ref path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                println!("✅ Report saved to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }
    Ok(())
}

/// Where the configuration came from. Logged once logging is up.
enum ConfigOrigin {
    File(PathBuf),
    DefaultFile,
    Defaults,
    Unreadable(anyhow::Error),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => info!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so nothing is logged here.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    // Try default location
    Ok(match Config::load_default() {
        Ok(Some(config)) => (config, ConfigOrigin::DefaultFile),
        Ok(None) => (Config::default(), ConfigOrigin::Defaults),
        Err(e) => (Config::default(), ConfigOrigin::Unreadable(e)),
    })
}
