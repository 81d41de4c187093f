//! Command-line entry point for the ELO replay
//!
//! Loads configuration, replays the full match history from the dataset
//! into the rating store, and prints the top-rated teams.

use anyhow::Result;
use clap::Parser;
use elo_replay::config::{validate_config, AppConfig};
use elo_replay::dataset::SqliteDataset;
use elo_replay::replay::ReplayEngine;
use elo_replay::report::{RatingReport, ReportFormat};
use elo_replay::SqliteRatingStore;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// ELO Replay - recompute team ratings from the full match history
#[derive(Parser)]
#[command(
    name = "elo-replay",
    version,
    about = "Recompute ELO team ratings by replaying the full match history",
    long_about = "ELO Replay resets every stored team rating to the default, replays all \
                 selected matches from the dataset in ascending match id order using a \
                 fixed-K ELO update, and prints the highest-rated teams."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Match dataset override
    #[arg(long, value_name = "PATH", help = "Path to the SQLite match dataset")]
    dataset: Option<String>,

    /// Rating store override
    #[arg(
        long,
        value_name = "PATH",
        help = "Path to the SQLite rating store (\":memory:\" for a throwaway store)"
    )]
    store: Option<String>,

    /// Match id floor override
    #[arg(long, value_name = "ID", help = "Only replay matches with a greater match id")]
    min_match_id: Option<i64>,

    /// Match status override
    #[arg(long, value_name = "STATUS", help = "Only replay matches with at least this status")]
    min_status: Option<i64>,

    /// League tier override
    #[arg(long, value_name = "TIER", help = "Only replay matches from leagues of this tier")]
    league_tier: Option<i64>,

    /// Disable the league tier filter
    #[arg(long, conflicts_with = "league_tier", help = "Replay matches from every league tier")]
    any_tier: bool,

    /// Default rating override
    #[arg(long, value_name = "RATING", help = "Rating of a newly seen team")]
    default_rating: Option<i64>,

    /// K-factor override
    #[arg(long, value_name = "K", help = "Maximum rating swing per match")]
    k_factor: Option<i64>,

    /// Report size override
    #[arg(long, value_name = "N", help = "Number of teams to print")]
    top: Option<usize>,

    /// Report format override
    #[arg(long, value_name = "FORMAT", help = "Report format (text, json)")]
    format: Option<String>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without replaying")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Display startup banner with run information
fn display_startup_banner(config: &AppConfig) {
    info!("ELO Replay v{}", elo_replay::VERSION);
    info!("   Dataset: {}", config.dataset.path);
    info!("   Store: {}", config.store.path);
    info!(
        "   Default rating: {}, K-factor: {}",
        config.rating.default_rating, config.rating.k_factor
    );
    info!("   Filter: {:?}", config.event_filter());
    info!("   Report: top {} ({})", config.report.limit, config.report.format);
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    apply_overrides(&mut config, args);

    validate_config(&config)?;
    Ok(config)
}

/// Apply CLI arguments on top of file/environment configuration
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(dataset) = &args.dataset {
        config.dataset.path = dataset.clone();
    }
    if let Some(store) = &args.store {
        config.store.path = store.clone();
    }
    if let Some(floor) = args.min_match_id {
        config.dataset.min_match_id = Some(floor);
    }
    if let Some(status) = args.min_status {
        config.dataset.min_status = Some(status);
    }
    if let Some(tier) = args.league_tier {
        config.dataset.league_tier = Some(tier);
    }
    if args.any_tier {
        config.dataset.league_tier = None;
    }
    if let Some(rating) = args.default_rating {
        config.rating.default_rating = rating;
    }
    if let Some(k) = args.k_factor {
        config.rating.k_factor = k;
    }
    if let Some(top) = args.top {
        config.report.limit = top;
    }
    if let Some(format) = &args.format {
        config.report.format = format.clone();
    }
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }
}

fn open_store(path: &str) -> Result<SqliteRatingStore> {
    if path == ":memory:" {
        SqliteRatingStore::open_in_memory()
    } else {
        SqliteRatingStore::open(Path::new(path))
    }
}

/// Replay the history and render the report
fn run(config: &AppConfig) -> Result<String> {
    let format: ReportFormat = config.report.format.parse()?;
    let dataset = SqliteDataset::open(Path::new(&config.dataset.path))?;
    let mut store = open_store(&config.store.path)?;

    let engine = ReplayEngine::new(config.rating)?
        .with_progress_interval(config.service.progress_interval);
    let summary = engine.run(&mut store, &dataset, &config.event_filter(), &dataset)?;

    if let Some(match_id) = summary.last_match_id {
        info!(match_id, "Last replayed match");
    }

    RatingReport::top(&store, config.report.limit)?.render(format)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Dry run completed - exiting without replaying");
        return Ok(());
    }

    match run(&config) {
        Ok(report) => {
            print!("{report}");
            Ok(())
        }
        Err(e) => {
            error!("Replay failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
