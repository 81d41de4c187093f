//! Rating system configuration

use serde::{Deserialize, Serialize};

/// Largest accepted magnitude for the default rating and the K-factor.
/// Keeps every rating reachable by a replay well inside `i64`.
pub const MAX_RATING_MAGNITUDE: i64 = 1_000_000_000;

/// Parameters of the ELO update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    /// Rating given to a team the first time it is seen, and on reset
    pub default_rating: i64,
    /// Maximum rating swing per match
    pub k_factor: i64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            default_rating: 1200,
            k_factor: 50,
        }
    }
}

impl EloConfig {
    pub fn new(default_rating: i64, k_factor: i64) -> Self {
        Self {
            default_rating,
            k_factor,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.k_factor <= 0 {
            return Err(crate::error::ReplayError::ConfigurationError {
                message: format!("K-factor must be positive, got {}", self.k_factor),
            }
            .into());
        }
        if self.k_factor > MAX_RATING_MAGNITUDE {
            return Err(crate::error::ReplayError::ConfigurationError {
                message: format!(
                    "K-factor must be at most {MAX_RATING_MAGNITUDE}, got {}",
                    self.k_factor
                ),
            }
            .into());
        }
        if !(-MAX_RATING_MAGNITUDE..=MAX_RATING_MAGNITUDE).contains(&self.default_rating) {
            return Err(crate::error::ReplayError::ConfigurationError {
                message: format!(
                    "default rating must be within +/-{MAX_RATING_MAGNITUDE}, got {}",
                    self.default_rating
                ),
            }
            .into());
        }

        Ok(())
    }
}
