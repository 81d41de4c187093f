//! SQLite match dataset
//!
//! Read side of the replay: selects decided matches with their winning and
//! losing team, and resolves team display names.

use crate::replay::source::{EventFilter, MatchEventSource};
use crate::resolver::NameResolver;
use crate::types::{MatchId, MatchOutcome, TeamId};
use anyhow::Context;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use tracing::{debug, warn};

const SCHEMA_DATASET_V1: &str = r"
CREATE TABLE IF NOT EXISTS core_league (
  id INTEGER PRIMARY KEY,
  tier INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS core_team (
  id INTEGER PRIMARY KEY,
  name TEXT
);

CREATE TABLE IF NOT EXISTS core_match (
  id INTEGER PRIMARY KEY,
  match_id INTEGER NOT NULL UNIQUE,
  winner INTEGER NOT NULL,
  status INTEGER NOT NULL,
  league_id INTEGER NOT NULL REFERENCES core_league(id)
);

CREATE TABLE IF NOT EXISTS core_matchteam (
  match_id INTEGER NOT NULL REFERENCES core_match(id),
  side INTEGER NOT NULL,
  team_id INTEGER NOT NULL,
  PRIMARY KEY (match_id, side)
);

CREATE INDEX IF NOT EXISTS idx_core_match_match_id ON core_match(match_id);
";

const SELECT_OUTCOMES: &str = r"
SELECT matches.match_id, winners.team_id, losers.team_id
FROM core_match AS matches
INNER JOIN core_matchteam AS winners
  ON matches.id = winners.match_id
  AND matches.winner = winners.side
INNER JOIN core_matchteam AS losers
  ON matches.id = losers.match_id
  AND losers.team_id <> winners.team_id
INNER JOIN core_league AS league
  ON league.id = matches.league_id
WHERE (?1 IS NULL OR matches.match_id > ?1)
  AND (?2 IS NULL OR matches.status >= ?2)
  AND (?3 IS NULL OR league.tier = ?3)
ORDER BY matches.match_id ASC, losers.side ASC
";

/// Match history and team names in a SQLite database
pub struct SqliteDataset {
    conn: Connection,
}

impl SqliteDataset {
    /// Open an existing dataset read-only
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open match dataset at {}", path.display()))?;

        Ok(Self { conn })
    }

    /// Open (or create) a writable dataset with its schema applied
    pub fn create(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to create match dataset at {}", path.display()))?;
        let dataset = Self { conn };
        dataset.migrate()?;
        Ok(dataset)
    }

    pub fn open_in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory dataset")?;
        let dataset = Self { conn };
        dataset.migrate()?;
        Ok(dataset)
    }

    pub fn migrate(&self) -> crate::error::Result<()> {
        self.conn
            .execute_batch(SCHEMA_DATASET_V1)
            .context("failed to apply dataset schema")?;
        Ok(())
    }

    pub fn insert_league(&self, league_id: i64, tier: i64) -> crate::error::Result<()> {
        self.conn
            .execute(
                "INSERT INTO core_league(id, tier) VALUES (?1, ?2)",
                params![league_id, tier],
            )
            .with_context(|| format!("failed to insert league {league_id}"))?;
        Ok(())
    }

    pub fn insert_team(&self, team_id: TeamId, name: Option<&str>) -> crate::error::Result<()> {
        self.conn
            .execute(
                "INSERT INTO core_team(id, name) VALUES (?1, ?2)",
                params![team_id, name],
            )
            .with_context(|| format!("failed to insert team {team_id}"))?;
        Ok(())
    }

    /// Insert a two-sided match; side 0 is `radiant`, side 1 is `dire`
    pub fn insert_match(&mut self, record: &MatchRecord) -> crate::error::Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("failed to start match transaction")?;

        tx.execute(
            "INSERT INTO core_match(match_id, winner, status, league_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.match_id,
                record.winning_side,
                record.status,
                record.league_id
            ],
        )
        .with_context(|| format!("failed to insert match {}", record.match_id))?;
        let row_id = tx.last_insert_rowid();

        for (side, team_id) in [(0_i64, record.radiant), (1_i64, record.dire)] {
            tx.execute(
                "INSERT INTO core_matchteam(match_id, side, team_id) VALUES (?1, ?2, ?3)",
                params![row_id, side, team_id],
            )
            .with_context(|| format!("failed to insert side {side} of match {}", record.match_id))?;
        }

        tx.commit().context("failed to commit match")?;
        Ok(())
    }
}

/// A raw match row as stored in the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub radiant: TeamId,
    pub dire: TeamId,
    /// 0 when `radiant` won, 1 when `dire` won
    pub winning_side: i64,
    pub status: i64,
    pub league_id: i64,
}

impl MatchEventSource for SqliteDataset {
    fn fetch_outcomes(&self, filter: &EventFilter) -> crate::error::Result<Vec<MatchOutcome>> {
        let mut stmt = self
            .conn
            .prepare(SELECT_OUTCOMES)
            .context("failed to prepare match query")?;

        let outcomes = stmt
            .query_map(
                params![filter.min_match_id, filter.min_status, filter.league_tier],
                |row| {
                    Ok(MatchOutcome {
                        match_id: row.get(0)?,
                        winner: row.get(1)?,
                        loser: row.get(2)?,
                    })
                },
            )
            .context("failed to query match history")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read match history row")?;

        debug!(events = outcomes.len(), ?filter, "Loaded match outcomes");
        Ok(outcomes)
    }
}

impl NameResolver for SqliteDataset {
    fn resolve_name(&self, team_id: TeamId) -> Option<String> {
        let lookup = self
            .conn
            .prepare_cached("SELECT name FROM core_team WHERE id = ?1")
            .and_then(|mut stmt| {
                let name = stmt
                    .query_row(params![team_id], |row| row.get::<_, Option<String>>(0))
                    .optional()?;
                Ok(name)
            });

        match lookup {
            Ok(name) => name.flatten(),
            Err(err) => {
                warn!(team_id, error = %err, "Team name lookup failed");
                None
            }
        }
    }
}
