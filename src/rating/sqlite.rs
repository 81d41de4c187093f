//! SQLite-backed rating store
//!
//! One row per team in the `team` table. A replay run holds an IMMEDIATE
//! transaction from `begin_run` to `commit_run`/`abort_run`, which gives
//! the run exclusive write access to the database file.

use crate::error::ReplayError;
use crate::rating::storage::RatingStore;
use crate::resolver::NameResolver;
use crate::types::{RatingSnapshot, TeamId, TeamRating};
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

const SCHEMA_TEAM_V1: &str = r"
CREATE TABLE IF NOT EXISTS team (
  id INTEGER PRIMARY KEY,
  name TEXT NOT NULL DEFAULT '',
  elo INTEGER NOT NULL,
  games_played INTEGER NOT NULL DEFAULT 0 CHECK (games_played >= 0),
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_team_elo ON team(elo DESC, id ASC);
";

pub struct SqliteRatingStore {
    conn: Connection,
    in_run: bool,
}

impl SqliteRatingStore {
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open rating store at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory rating store")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> crate::error::Result<Self> {
        let store = Self {
            conn,
            in_run: false,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> crate::error::Result<()> {
        self.conn
            .execute_batch(SCHEMA_TEAM_V1)
            .context("failed to apply team schema")?;
        Ok(())
    }

    fn lookup(&self, team_id: TeamId) -> crate::error::Result<Option<RatingSnapshot>> {
        let snapshot = self
            .conn
            .prepare_cached("SELECT elo, games_played FROM team WHERE id = ?1")?
            .query_row(params![team_id], |row| {
                Ok(RatingSnapshot {
                    rating: row.get(0)?,
                    games_played: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })
            .optional()
            .with_context(|| format!("failed to read rating of team {team_id}"))?;

        Ok(snapshot)
    }
}

impl RatingStore for SqliteRatingStore {
    fn reset_all(&mut self, default_rating: i64) -> crate::error::Result<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self
            .conn
            .execute(
                "UPDATE team SET elo = ?1, updated_at = ?2",
                params![default_rating, now],
            )
            .context("failed to reset team ratings")?;

        debug!(teams = updated, default_rating, "Reset stored ratings");
        Ok(())
    }

    fn get_or_create(
        &mut self,
        team_id: TeamId,
        default_rating: i64,
        resolver: &dyn NameResolver,
    ) -> crate::error::Result<RatingSnapshot> {
        if let Some(snapshot) = self.lookup(team_id)? {
            return Ok(snapshot);
        }

        let name = resolver.resolve_name(team_id).unwrap_or_default();
        if name.is_empty() {
            debug!(team_id, "No display name for team");
        }

        let now = Utc::now().to_rfc3339();
        self.conn
            .prepare_cached(
                "INSERT INTO team(id, name, elo, games_played, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            )?
            .execute(params![team_id, name, default_rating, now])
            .with_context(|| format!("failed to create team {team_id}"))?;

        debug!(team_id, name = %name, default_rating, "Created team rating");

        Ok(RatingSnapshot {
            rating: default_rating,
            games_played: 0,
        })
    }

    fn set_rating(&mut self, team_id: TeamId, rating: i64) -> crate::error::Result<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self
            .conn
            .prepare_cached(
                "UPDATE team SET elo = ?1, games_played = games_played + 1, updated_at = ?2
                 WHERE id = ?3",
            )?
            .execute(params![rating, now, team_id])
            .with_context(|| format!("failed to update rating of team {team_id}"))?;

        if updated == 0 {
            return Err(ReplayError::TeamNotFound { team_id }.into());
        }

        Ok(())
    }

    fn get_rating(&self, team_id: TeamId) -> crate::error::Result<Option<TeamRating>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, name, elo, games_played, created_at, updated_at FROM team WHERE id = ?1",
        )?;

        let raw = stmt
            .query_row(params![team_id], parse_team_row)
            .optional()
            .with_context(|| format!("failed to read team {team_id}"))?;

        raw.map(RawTeamRow::into_rating).transpose()
    }

    fn top_ratings(&self, limit: usize) -> crate::error::Result<Vec<TeamRating>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, name, elo, games_played, created_at, updated_at
             FROM team ORDER BY elo DESC, id ASC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit], parse_team_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read team ratings")?;

        rows.into_iter().map(RawTeamRow::into_rating).collect()
    }

    fn team_count(&self) -> crate::error::Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM team", [], |row| row.get(0))
            .context("failed to count teams")?;

        usize::try_from(count).with_context(|| format!("invalid team count: {count}"))
    }

    fn begin_run(&mut self) -> crate::error::Result<()> {
        if self.in_run {
            return Err(ReplayError::StoreFailure {
                message: "a replay run already holds this store".to_string(),
            }
            .into());
        }

        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .context("failed to acquire rating store for replay")?;
        self.in_run = true;
        Ok(())
    }

    fn commit_run(&mut self) -> crate::error::Result<()> {
        if !self.in_run {
            return Ok(());
        }

        self.conn
            .execute_batch("COMMIT")
            .context("failed to commit replay")?;
        self.in_run = false;
        Ok(())
    }

    fn abort_run(&mut self) -> crate::error::Result<()> {
        if !self.in_run {
            return Ok(());
        }

        self.in_run = false;
        self.conn
            .execute_batch("ROLLBACK")
            .context("failed to roll back replay")?;
        Ok(())
    }
}

struct RawTeamRow {
    team_id: TeamId,
    name: String,
    rating: i64,
    games_played: i64,
    created_at: String,
    updated_at: String,
}

impl RawTeamRow {
    fn into_rating(self) -> crate::error::Result<TeamRating> {
        Ok(TeamRating {
            team_id: self.team_id,
            display_name: self.name,
            rating: self.rating,
            games_played: u64::try_from(self.games_played)
                .map_err(|_| anyhow!("negative games_played for team {}", self.team_id))?,
            created_at: parse_timestamp(&self.created_at)?,
            last_updated: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_team_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTeamRow> {
    Ok(RawTeamRow {
        team_id: row.get(0)?,
        name: row.get(1)?,
        rating: row.get(2)?,
        games_played: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn parse_timestamp(raw: &str) -> crate::error::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("invalid stored timestamp: {raw}"))
}
