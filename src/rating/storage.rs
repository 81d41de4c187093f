//! Rating storage interface and in-memory implementation
//!
//! The store holds one record per team. It knows nothing about matches; the
//! replay engine drives it through reset, lazy creation and point updates.

use crate::error::ReplayError;
use crate::resolver::NameResolver;
use crate::types::{RatingSnapshot, TeamId, TeamRating};
use std::collections::HashMap;
use tracing::debug;

/// Trait for rating storage operations.
///
/// Mutating methods take `&mut self`: a replay run holds the store
/// exclusively from `begin_run` until `commit_run` or `abort_run`.
pub trait RatingStore {
    /// Set every existing rating to `default_rating`.
    /// Names and games played are left untouched.
    fn reset_all(&mut self, default_rating: i64) -> crate::error::Result<()>;

    /// Return the team's current rating, creating the record on first sight.
    ///
    /// Creation resolves the display name once through `resolver` and
    /// starts the team at `default_rating` with zero games played.
    fn get_or_create(
        &mut self,
        team_id: TeamId,
        default_rating: i64,
        resolver: &dyn NameResolver,
    ) -> crate::error::Result<RatingSnapshot>;

    /// Overwrite the rating of an existing team
    fn set_rating(&mut self, team_id: TeamId, rating: i64) -> crate::error::Result<()>;

    /// Get a team's rating record
    fn get_rating(&self, team_id: TeamId) -> crate::error::Result<Option<TeamRating>>;

    /// Teams ordered by rating descending, ties by team id, truncated to `limit`
    fn top_ratings(&self, limit: usize) -> crate::error::Result<Vec<TeamRating>>;

    /// Get total number of rated teams
    fn team_count(&self) -> crate::error::Result<usize>;

    /// Acquire the store for a replay run
    fn begin_run(&mut self) -> crate::error::Result<()> {
        Ok(())
    }

    /// Make the run's writes final and release the store
    fn commit_run(&mut self) -> crate::error::Result<()> {
        Ok(())
    }

    /// Release the store after a failed run
    fn abort_run(&mut self) -> crate::error::Result<()> {
        Ok(())
    }
}

/// In-memory rating storage implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: HashMap<TeamId, TeamRating>,
    run_backup: Option<HashMap<TeamId, TeamRating>>,
}

impl InMemoryRatingStore {
    /// Create a new in-memory rating store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a replay run currently holds the store
    pub fn in_run(&self) -> bool {
        self.run_backup.is_some()
    }

    /// Insert a record directly, bypassing lazy creation
    pub fn insert(&mut self, entry: TeamRating) {
        self.ratings.insert(entry.team_id, entry);
    }
}

impl RatingStore for InMemoryRatingStore {
    fn reset_all(&mut self, default_rating: i64) -> crate::error::Result<()> {
        for entry in self.ratings.values_mut() {
            entry.rating = default_rating;
        }
        Ok(())
    }

    fn get_or_create(
        &mut self,
        team_id: TeamId,
        default_rating: i64,
        resolver: &dyn NameResolver,
    ) -> crate::error::Result<RatingSnapshot> {
        let entry = self.ratings.entry(team_id).or_insert_with(|| {
            let name = resolver.resolve_name(team_id).unwrap_or_default();
            debug!(team_id, name = %name, default_rating, "Creating team rating");
            TeamRating::new(team_id, name, default_rating)
        });

        Ok(entry.snapshot())
    }

    fn set_rating(&mut self, team_id: TeamId, rating: i64) -> crate::error::Result<()> {
        let entry = self
            .ratings
            .get_mut(&team_id)
            .ok_or(ReplayError::TeamNotFound { team_id })?;

        entry.update_rating(rating);
        Ok(())
    }

    fn get_rating(&self, team_id: TeamId) -> crate::error::Result<Option<TeamRating>> {
        Ok(self.ratings.get(&team_id).cloned())
    }

    fn top_ratings(&self, limit: usize) -> crate::error::Result<Vec<TeamRating>> {
        let mut entries: Vec<TeamRating> = self.ratings.values().cloned().collect();

        // Sort by rating (descending)
        entries.sort_by(|a, b| b.rating.cmp(&a.rating).then(a.team_id.cmp(&b.team_id)));
        entries.truncate(limit);

        Ok(entries)
    }

    fn team_count(&self) -> crate::error::Result<usize> {
        Ok(self.ratings.len())
    }

    fn begin_run(&mut self) -> crate::error::Result<()> {
        if self.run_backup.is_some() {
            return Err(ReplayError::StoreFailure {
                message: "a replay run already holds this store".to_string(),
            }
            .into());
        }
        self.run_backup = Some(self.ratings.clone());
        Ok(())
    }

    fn commit_run(&mut self) -> crate::error::Result<()> {
        self.run_backup = None;
        Ok(())
    }

    fn abort_run(&mut self) -> crate::error::Result<()> {
        if let Some(backup) = self.run_backup.take() {
            self.ratings = backup;
        }
        Ok(())
    }
}
