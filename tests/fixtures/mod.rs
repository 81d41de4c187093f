//! Test fixtures and store wrappers for integration testing

use elo_replay::dataset::{MatchRecord, SqliteDataset};
use elo_replay::error::Result;
use elo_replay::{
    InMemoryRatingStore, MatchId, NameResolver, RatingSnapshot, RatingStore, ReplayError, TeamId,
    TeamRating,
};

/// League used by every fixture match
pub const TIER_THREE_LEAGUE: i64 = 1;

/// Rating store that records calls and can fail on a chosen write
#[derive(Debug, Default)]
pub struct RecordingRatingStore {
    inner: InMemoryRatingStore,
    pub fail_on_write: Option<usize>,
    pub writes: Vec<(TeamId, i64)>,
    pub resets: usize,
    pub commits: usize,
    pub aborts: usize,
}

impl RecordingRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th (zero-based) call to `set_rating`
    pub fn failing_on_write(index: usize) -> Self {
        Self {
            fail_on_write: Some(index),
            ..Self::default()
        }
    }

    pub fn rating(&self, team_id: TeamId) -> Option<i64> {
        self.inner
            .get_rating(team_id)
            .ok()
            .flatten()
            .map(|entry| entry.rating)
    }
}

impl RatingStore for RecordingRatingStore {
    fn reset_all(&mut self, default_rating: i64) -> Result<()> {
        self.resets += 1;
        self.inner.reset_all(default_rating)
    }

    fn get_or_create(
        &mut self,
        team_id: TeamId,
        default_rating: i64,
        resolver: &dyn NameResolver,
    ) -> Result<RatingSnapshot> {
        self.inner.get_or_create(team_id, default_rating, resolver)
    }

    fn set_rating(&mut self, team_id: TeamId, rating: i64) -> Result<()> {
        if self.fail_on_write == Some(self.writes.len()) {
            return Err(ReplayError::StoreFailure {
                message: format!("write {} rejected", self.writes.len()),
            }
            .into());
        }
        self.writes.push((team_id, rating));
        self.inner.set_rating(team_id, rating)
    }

    fn get_rating(&self, team_id: TeamId) -> Result<Option<TeamRating>> {
        self.inner.get_rating(team_id)
    }

    fn top_ratings(&self, limit: usize) -> Result<Vec<TeamRating>> {
        self.inner.top_ratings(limit)
    }

    fn team_count(&self) -> Result<usize> {
        self.inner.team_count()
    }

    fn begin_run(&mut self) -> Result<()> {
        self.inner.begin_run()
    }

    fn commit_run(&mut self) -> Result<()> {
        self.commits += 1;
        self.inner.commit_run()
    }

    fn abort_run(&mut self) -> Result<()> {
        self.aborts += 1;
        self.inner.abort_run()
    }
}

/// A decided tier-three match with status 4
pub fn decided_match(match_id: MatchId, winner: TeamId, loser: TeamId) -> MatchRecord {
    MatchRecord {
        match_id,
        radiant: winner,
        dire: loser,
        winning_side: 0,
        status: 4,
        league_id: TIER_THREE_LEAGUE,
    }
}

/// Dataset with a tier-three league, named teams, and the given matches
pub fn dataset_with(teams: &[(TeamId, Option<&str>)], matches: &[MatchRecord]) -> SqliteDataset {
    let mut dataset = SqliteDataset::open_in_memory().unwrap();
    dataset.insert_league(TIER_THREE_LEAGUE, 3).unwrap();
    for (team_id, name) in teams {
        dataset.insert_team(*team_id, *name).unwrap();
    }
    for record in matches {
        dataset.insert_match(record).unwrap();
    }
    dataset
}
