//! Top-N rating report printed after a replay

use crate::rating::storage::RatingStore;
use crate::types::{TeamId, TeamRating};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(anyhow!("Invalid report format: {}", raw)),
        }
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub rank: usize,
    pub team_id: TeamId,
    pub name: String,
    pub rating: i64,
    pub games_played: u64,
}

/// Highest-rated teams, best first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingReport {
    pub rows: Vec<ReportRow>,
}

impl RatingReport {
    /// Query the `limit` highest-rated teams from the store
    pub fn top<S>(store: &S, limit: usize) -> crate::error::Result<Self>
    where
        S: RatingStore + ?Sized,
    {
        let teams = store
            .top_ratings(limit)
            .context("failed to load top ratings")?;
        Ok(Self::from_ratings(&teams))
    }

    pub fn from_ratings(teams: &[TeamRating]) -> Self {
        let rows = teams
            .iter()
            .enumerate()
            .map(|(index, team)| ReportRow {
                rank: index + 1,
                team_id: team.team_id,
                name: team.label(),
                rating: team.rating,
                games_played: team.games_played,
            })
            .collect();

        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self, format: ReportFormat) -> crate::error::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => {
                let mut json =
                    serde_json::to_string_pretty(self).context("failed to serialize report")?;
                json.push('\n');
                Ok(json)
            }
        }
    }
}

impl fmt::Display for RatingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}: {}", row.name, row.rating)?;
        }
        Ok(())
    }
}
