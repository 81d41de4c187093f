//! Error types for the rating replay
//!
//! Propagation goes through anyhow; the variants below name the conditions
//! that abort a replay run.

use crate::types::{MatchId, TeamId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Fatal conditions raised while replaying the match history
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Rating store failure: {message}")]
    StoreFailure { message: String },

    #[error("Match event source failure: {message}")]
    SourceFailure { message: String },

    #[error("Team not found in rating store: {team_id}")]
    TeamNotFound { team_id: TeamId },

    #[error("Invalid match event {match_id}: {reason}")]
    InvalidEvent { match_id: MatchId, reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}
