//! Common types used throughout the rating replay

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a team
pub type TeamId = i64;

/// Identifier of a match; its ascending order is the replay order
pub type MatchId = i64;

/// A single win/loss outcome from the match history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub match_id: MatchId,
    pub winner: TeamId,
    pub loser: TeamId,
}

impl MatchOutcome {
    pub fn new(match_id: MatchId, winner: TeamId, loser: TeamId) -> Self {
        Self {
            match_id,
            winner,
            loser,
        }
    }
}

/// Current rating and update count of a team as seen by the replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub rating: i64,
    pub games_played: u64,
}

/// Stored rating record for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub team_id: TeamId,
    /// Resolved once at creation; empty when the name was unknown
    pub display_name: String,
    pub rating: i64,
    pub games_played: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl TeamRating {
    /// Create a fresh record for a team seen for the first time
    pub fn new(team_id: TeamId, display_name: String, initial_rating: i64) -> Self {
        let now = Utc::now();
        Self {
            team_id,
            display_name,
            rating: initial_rating,
            games_played: 0,
            created_at: now,
            last_updated: now,
        }
    }

    /// Overwrite the rating and count the update
    pub fn update_rating(&mut self, new_rating: i64) {
        self.rating = new_rating;
        self.games_played += 1;
        self.last_updated = Utc::now();
    }

    pub fn snapshot(&self) -> RatingSnapshot {
        RatingSnapshot {
            rating: self.rating,
            games_played: self.games_played,
        }
    }

    /// Name for display, falling back to the id for unresolved teams
    pub fn label(&self) -> String {
        if self.display_name.is_empty() {
            format!("team {}", self.team_id)
        } else {
            self.display_name.clone()
        }
    }
}
