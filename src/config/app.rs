//! Main application configuration
//!
//! This module defines the configuration of a replay run, including
//! environment variable and TOML file loading and validation.

use crate::config::rating::EloConfig;
use crate::replay::EventFilter;
use crate::types::MatchId;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: EloConfig,
    pub dataset: DatasetSettings,
    pub store: StoreSettings,
    pub report: ReportSettings,
}

/// Process-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log progress every N applied matches
    pub progress_interval: u64,
}

/// Match dataset location and selection criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Path to the SQLite match dataset
    pub path: String,
    /// Only matches with a strictly greater match id are replayed
    pub min_match_id: Option<MatchId>,
    /// Only matches with at least this status are replayed
    pub min_status: Option<i64>,
    /// Only matches from leagues of this tier are replayed
    pub league_tier: Option<i64>,
}

/// Rating store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite rating store, or ":memory:"
    pub path: String,
}

/// Final report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Number of teams to print
    pub limit: usize,
    /// Output format (text, json)
    pub format: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "elo-replay".to_string(),
            log_level: "info".to_string(),
            progress_interval: 100,
        }
    }
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            path: "dataset.sqlite".to_string(),
            min_match_id: Some(884_352_157),
            min_status: Some(4),
            league_tier: Some(3),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: "ratings.sqlite".to_string(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            limit: 50,
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(interval) = env::var("PROGRESS_INTERVAL") {
            self.service.progress_interval = interval
                .parse()
                .map_err(|_| anyhow!("Invalid PROGRESS_INTERVAL value: {}", interval))?;
        }

        // Rating settings
        if let Ok(rating) = env::var("ELO_DEFAULT_RATING") {
            self.rating.default_rating = rating
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_DEFAULT_RATING value: {}", rating))?;
        }
        if let Ok(k) = env::var("ELO_K_FACTOR") {
            self.rating.k_factor = k
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_K_FACTOR value: {}", k))?;
        }

        // Dataset settings
        if let Ok(path) = env::var("DATASET_PATH") {
            self.dataset.path = path;
        }
        if let Ok(floor) = env::var("MIN_MATCH_ID") {
            self.dataset.min_match_id = Some(
                floor
                    .parse()
                    .map_err(|_| anyhow!("Invalid MIN_MATCH_ID value: {}", floor))?,
            );
        }
        if let Ok(status) = env::var("MIN_STATUS") {
            self.dataset.min_status = Some(
                status
                    .parse()
                    .map_err(|_| anyhow!("Invalid MIN_STATUS value: {}", status))?,
            );
        }
        if let Ok(tier) = env::var("LEAGUE_TIER") {
            self.dataset.league_tier = Some(
                tier.parse()
                    .map_err(|_| anyhow!("Invalid LEAGUE_TIER value: {}", tier))?,
            );
        }

        // Store settings
        if let Ok(path) = env::var("STORE_PATH") {
            self.store.path = path;
        }

        // Report settings
        if let Ok(limit) = env::var("REPORT_LIMIT") {
            self.report.limit = limit
                .parse()
                .map_err(|_| anyhow!("Invalid REPORT_LIMIT value: {}", limit))?;
        }

        Ok(())
    }

    /// Selection criteria for the match dataset
    pub fn event_filter(&self) -> EventFilter {
        EventFilter {
            min_match_id: self.dataset.min_match_id,
            min_status: self.dataset.min_status,
            league_tier: self.dataset.league_tier,
        }
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.progress_interval == 0 {
        return Err(anyhow!("Progress interval must be greater than 0"));
    }

    config.rating.validate()?;

    if config.dataset.path.is_empty() {
        return Err(anyhow!("Dataset path cannot be empty"));
    }
    if config.store.path.is_empty() {
        return Err(anyhow!("Store path cannot be empty"));
    }

    if config.report.limit == 0 {
        return Err(anyhow!("Report limit must be greater than 0"));
    }
    match config.report.format.to_lowercase().as_str() {
        "text" | "json" => {}
        _ => return Err(anyhow!("Invalid report format: {}", config.report.format)),
    }

    Ok(())
}
