//! Replay engine
//!
//! Recomputes every team rating from scratch: acquire the store, reset all
//! ratings to the default, then fold the ordered match history one event at
//! a time. Each event reads the ratings left by the previous one, so the
//! fold is strictly sequential.

use crate::config::rating::EloConfig;
use crate::error::ReplayError;
use crate::rating::calculator::{EloCalculator, EloUpdate};
use crate::rating::storage::RatingStore;
use crate::replay::source::{EventFilter, MatchEventSource};
use crate::resolver::NameResolver;
use crate::types::{MatchId, MatchOutcome};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Outcome of a completed replay run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub run_id: Uuid,
    pub events_applied: u64,
    pub teams_created: usize,
    /// Match id of the last applied event
    pub last_match_id: Option<MatchId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct FoldProgress {
    events_applied: u64,
    last_match_id: Option<MatchId>,
}

/// Folds match outcomes into team ratings
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    config: EloConfig,
    calculator: EloCalculator,
    progress_interval: u64,
}

impl ReplayEngine {
    /// Create an engine for the given rating parameters
    pub fn new(config: EloConfig) -> crate::error::Result<Self> {
        let calculator = EloCalculator::new(&config)?;

        Ok(Self {
            config,
            calculator,
            progress_interval: 100,
        })
    }

    /// Log progress every `interval` applied events
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn config(&self) -> &EloConfig {
        &self.config
    }

    /// Full replay: reset the store and fold every event `source` selects
    pub fn run<S, E>(
        &self,
        store: &mut S,
        source: &E,
        filter: &EventFilter,
        resolver: &dyn NameResolver,
    ) -> crate::error::Result<ReplaySummary>
    where
        S: RatingStore + ?Sized,
        E: MatchEventSource + ?Sized,
    {
        self.in_run(store, |engine, store| {
            let outcomes = source.fetch_outcomes(filter).map_err(|err| {
                ReplayError::SourceFailure {
                    message: format!("{err:#}"),
                }
            })?;
            info!(events = outcomes.len(), "Fetched match history");
            engine.fold(store, outcomes, resolver)
        })
    }

    /// Full replay over outcomes already in hand, in the order given
    pub fn replay<S, I>(
        &self,
        store: &mut S,
        outcomes: I,
        resolver: &dyn NameResolver,
    ) -> crate::error::Result<ReplaySummary>
    where
        S: RatingStore + ?Sized,
        I: IntoIterator<Item = MatchOutcome>,
    {
        self.in_run(store, |engine, store| engine.fold(store, outcomes, resolver))
    }

    /// Apply a single outcome against the store's current ratings
    pub fn apply_event<S>(
        &self,
        store: &mut S,
        outcome: &MatchOutcome,
        resolver: &dyn NameResolver,
    ) -> crate::error::Result<EloUpdate>
    where
        S: RatingStore + ?Sized,
    {
        if outcome.winner == outcome.loser {
            return Err(ReplayError::InvalidEvent {
                match_id: outcome.match_id,
                reason: format!("team {} listed as both winner and loser", outcome.winner),
            }
            .into());
        }

        let default_rating = self.config.default_rating;
        let winner = store
            .get_or_create(outcome.winner, default_rating, resolver)
            .with_context(|| format!("failed to load rating of team {}", outcome.winner))?;
        let loser = store
            .get_or_create(outcome.loser, default_rating, resolver)
            .with_context(|| format!("failed to load rating of team {}", outcome.loser))?;

        let update = self.calculator.update(winner.rating, loser.rating);

        store
            .set_rating(outcome.winner, update.winner_after)
            .with_context(|| format!("failed to store rating of team {}", outcome.winner))?;
        store
            .set_rating(outcome.loser, update.loser_after)
            .with_context(|| format!("failed to store rating of team {}", outcome.loser))?;

        debug!(
            match_id = outcome.match_id,
            winner = outcome.winner,
            loser = outcome.loser,
            winner_rating = update.winner_after,
            loser_rating = update.loser_after,
            delta = update.delta,
            "Applied match"
        );

        Ok(update)
    }

    /// Hold the store for the whole run, releasing it on success or failure
    fn in_run<S, F>(&self, store: &mut S, body: F) -> crate::error::Result<ReplaySummary>
    where
        S: RatingStore + ?Sized,
        F: FnOnce(&Self, &mut S) -> crate::error::Result<FoldProgress>,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("replay", %run_id);
        let _enter = span.enter();
        let started_at = Utc::now();

        store.begin_run()?;

        let result = store
            .team_count()
            .and_then(|teams_before| {
                store.reset_all(self.config.default_rating)?;
                info!(
                    teams = teams_before,
                    default_rating = self.config.default_rating,
                    "Reset all ratings"
                );
                let progress = body(self, &mut *store)?;
                let teams_after = store.team_count()?;
                Ok((progress, teams_after.saturating_sub(teams_before)))
            });

        match result {
            Ok((progress, teams_created)) => {
                if let Err(err) = store.commit_run() {
                    let message = format!("{err:#}");
                    error!(error = %message, "Failed to commit replay");
                    if let Err(release_err) = store.abort_run() {
                        warn!(error = %release_err, "Failed to release rating store");
                    }
                    return Err(err.context("failed to commit replay run"));
                }

                let summary = ReplaySummary {
                    run_id,
                    events_applied: progress.events_applied,
                    teams_created,
                    last_match_id: progress.last_match_id,
                    started_at,
                    finished_at: Utc::now(),
                };
                info!(
                    events = summary.events_applied,
                    teams_created = summary.teams_created,
                    last_match_id = ?summary.last_match_id,
                    "Replay completed"
                );
                Ok(summary)
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(error = %message, "Replay aborted");
                if let Err(release_err) = store.abort_run() {
                    warn!(error = %release_err, "Failed to release rating store");
                }
                Err(err)
            }
        }
    }

    fn fold<S, I>(
        &self,
        store: &mut S,
        outcomes: I,
        resolver: &dyn NameResolver,
    ) -> crate::error::Result<FoldProgress>
    where
        S: RatingStore + ?Sized,
        I: IntoIterator<Item = MatchOutcome>,
    {
        let mut progress = FoldProgress::default();

        for outcome in outcomes {
            self.apply_event(store, &outcome, resolver)?;
            progress.events_applied += 1;
            progress.last_match_id = Some(outcome.match_id);

            if progress.events_applied % self.progress_interval == 0 {
                info!(
                    processed = progress.events_applied,
                    match_id = outcome.match_id,
                    "Processed matches"
                );
            }
        }

        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::storage::InMemoryRatingStore;
    use crate::replay::source::InMemoryEventSource;
    use crate::resolver::{NoNames, StaticNameResolver};
    use crate::types::{RatingSnapshot, TeamId, TeamRating};

    fn engine() -> ReplayEngine {
        ReplayEngine::new(EloConfig::default()).unwrap()
    }

    fn rating_of(store: &InMemoryRatingStore, team_id: TeamId) -> i64 {
        store.get_rating(team_id).unwrap().unwrap().rating
    }

    /// Store that fails every write after the first `allowed_writes`
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryRatingStore,
        allowed_writes: usize,
        writes: usize,
        aborted: bool,
    }

    impl RatingStore for FlakyStore {
        fn reset_all(&mut self, default_rating: i64) -> crate::error::Result<()> {
            self.inner.reset_all(default_rating)
        }

        fn get_or_create(
            &mut self,
            team_id: TeamId,
            default_rating: i64,
            resolver: &dyn NameResolver,
        ) -> crate::error::Result<RatingSnapshot> {
            self.inner.get_or_create(team_id, default_rating, resolver)
        }

        fn set_rating(&mut self, team_id: TeamId, rating: i64) -> crate::error::Result<()> {
            if self.writes >= self.allowed_writes {
                return Err(ReplayError::StoreFailure {
                    message: "disk full".to_string(),
                }
                .into());
            }
            self.writes += 1;
            self.inner.set_rating(team_id, rating)
        }

        fn get_rating(&self, team_id: TeamId) -> crate::error::Result<Option<TeamRating>> {
            self.inner.get_rating(team_id)
        }

        fn top_ratings(&self, limit: usize) -> crate::error::Result<Vec<TeamRating>> {
            self.inner.top_ratings(limit)
        }

        fn team_count(&self) -> crate::error::Result<usize> {
            self.inner.team_count()
        }

        fn abort_run(&mut self) -> crate::error::Result<()> {
            self.aborted = true;
            Ok(())
        }
    }

    #[test]
    fn test_single_event_between_new_teams() {
        let mut store = InMemoryRatingStore::new();
        let summary = engine()
            .replay(&mut store, vec![MatchOutcome::new(1, 10, 20)], &NoNames)
            .unwrap();

        assert_eq!(rating_of(&store, 10), 1225);
        assert_eq!(rating_of(&store, 20), 1175);
        assert_eq!(summary.events_applied, 1);
        assert_eq!(summary.teams_created, 2);
        assert_eq!(summary.last_match_id, Some(1));
    }

    #[test]
    fn test_apply_event_uses_current_ratings() {
        let mut store = InMemoryRatingStore::new();
        store.insert(TeamRating::new(1, "A".to_string(), 1000));
        store.insert(TeamRating::new(2, "B".to_string(), 1400));

        let update = engine()
            .apply_event(&mut store, &MatchOutcome::new(1, 1, 2), &NoNames)
            .unwrap();

        assert_eq!(update.delta, 5);
        assert_eq!(rating_of(&store, 1), 1005);
        assert_eq!(rating_of(&store, 2), 1395);
    }

    #[test]
    fn test_replay_resets_previous_ratings() {
        let mut store = InMemoryRatingStore::new();
        store.insert(TeamRating::new(1, "A".to_string(), 1800));
        store.insert(TeamRating::new(2, "B".to_string(), 900));

        let summary = engine()
            .replay(&mut store, vec![MatchOutcome::new(1, 1, 2)], &NoNames)
            .unwrap();

        assert_eq!(rating_of(&store, 1), 1225);
        assert_eq!(rating_of(&store, 2), 1175);
        assert_eq!(summary.teams_created, 0);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let outcomes = vec![
            MatchOutcome::new(1, 1, 2),
            MatchOutcome::new(2, 2, 3),
            MatchOutcome::new(3, 3, 1),
            MatchOutcome::new(4, 1, 2),
            MatchOutcome::new(5, 4, 1),
        ];

        let mut store = InMemoryRatingStore::new();
        engine().replay(&mut store, outcomes.clone(), &NoNames).unwrap();
        let first = store.top_ratings(10).unwrap();

        engine().replay(&mut store, outcomes, &NoNames).unwrap();
        let second = store.top_ratings(10).unwrap();

        let ratings = |entries: &[TeamRating]| -> Vec<(TeamId, i64)> {
            entries.iter().map(|e| (e.team_id, e.rating)).collect()
        };
        assert_eq!(ratings(&first), ratings(&second));
    }

    #[test]
    fn test_order_sensitivity() {
        let seeded = || {
            let mut store = InMemoryRatingStore::new();
            store.insert(TeamRating::new(1, "A".to_string(), 1200));
            store.insert(TeamRating::new(2, "B".to_string(), 1300));
            store.insert(TeamRating::new(3, "C".to_string(), 1100));
            store
        };
        let a_beats_b = MatchOutcome::new(1, 1, 2);
        let b_beats_c = MatchOutcome::new(2, 2, 3);
        let engine = engine();

        let mut forward = seeded();
        engine.apply_event(&mut forward, &a_beats_b, &NoNames).unwrap();
        engine.apply_event(&mut forward, &b_beats_c, &NoNames).unwrap();

        let mut reversed = seeded();
        engine.apply_event(&mut reversed, &b_beats_c, &NoNames).unwrap();
        engine.apply_event(&mut reversed, &a_beats_b, &NoNames).unwrap();

        assert_ne!(rating_of(&forward, 2), rating_of(&reversed, 2));
        assert_ne!(rating_of(&forward, 3), rating_of(&reversed, 3));
    }

    #[test]
    fn test_total_rating_is_conserved() {
        let outcomes: Vec<MatchOutcome> = (0..200)
            .map(|i| MatchOutcome::new(i, i % 7, (i * 3 + 1) % 7))
            .filter(|o| o.winner != o.loser)
            .collect();

        let mut store = InMemoryRatingStore::new();
        let summary = engine().replay(&mut store, outcomes, &NoNames).unwrap();

        let teams = store.top_ratings(usize::MAX).unwrap();
        let total: i64 = teams.iter().map(|t| t.rating).sum();
        assert_eq!(total, 1200 * teams.len() as i64);
        assert_eq!(summary.teams_created, teams.len());
    }

    #[test]
    fn test_names_resolved_on_creation() {
        let resolver = StaticNameResolver::new().with_name(1, "Alpha");
        let mut store = InMemoryRatingStore::new();
        engine()
            .replay(&mut store, vec![MatchOutcome::new(1, 1, 2)], &resolver)
            .unwrap();

        assert_eq!(store.get_rating(1).unwrap().unwrap().display_name, "Alpha");
        assert_eq!(store.get_rating(2).unwrap().unwrap().display_name, "");
    }

    #[test]
    fn test_custom_config() {
        let engine = ReplayEngine::new(EloConfig::new(1500, 32)).unwrap();
        let mut store = InMemoryRatingStore::new();
        engine
            .replay(&mut store, vec![MatchOutcome::new(1, 1, 2)], &NoNames)
            .unwrap();

        assert_eq!(rating_of(&store, 1), 1516);
        assert_eq!(rating_of(&store, 2), 1484);
    }

    #[test]
    fn test_same_team_event_rejected() {
        let mut store = InMemoryRatingStore::new();
        let err = engine()
            .replay(&mut store, vec![MatchOutcome::new(9, 4, 4)], &NoNames)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReplayError>(),
            Some(ReplayError::InvalidEvent { match_id: 9, .. })
        ));
        assert!(!store.in_run());
    }

    #[test]
    fn test_store_failure_aborts_run() {
        let mut store = FlakyStore {
            allowed_writes: 2,
            ..FlakyStore::default()
        };
        let outcomes = vec![
            MatchOutcome::new(1, 1, 2),
            MatchOutcome::new(2, 2, 3),
            MatchOutcome::new(3, 3, 1),
        ];

        let err = engine().replay(&mut store, outcomes, &NoNames).unwrap_err();

        assert!(store.aborted);
        assert_eq!(store.writes, 2);
        assert!(format!("{err:#}").contains("disk full"));
    }

    #[test]
    fn test_commit_failure_releases_store() {
        /// Store whose commit is always refused
        #[derive(Default)]
        struct LockedStore {
            inner: InMemoryRatingStore,
            aborts: usize,
        }

        impl RatingStore for LockedStore {
            fn reset_all(&mut self, default_rating: i64) -> crate::error::Result<()> {
                self.inner.reset_all(default_rating)
            }

            fn get_or_create(
                &mut self,
                team_id: TeamId,
                default_rating: i64,
                resolver: &dyn NameResolver,
            ) -> crate::error::Result<RatingSnapshot> {
                self.inner.get_or_create(team_id, default_rating, resolver)
            }

            fn set_rating(&mut self, team_id: TeamId, rating: i64) -> crate::error::Result<()> {
                self.inner.set_rating(team_id, rating)
            }

            fn get_rating(&self, team_id: TeamId) -> crate::error::Result<Option<TeamRating>> {
                self.inner.get_rating(team_id)
            }

            fn top_ratings(&self, limit: usize) -> crate::error::Result<Vec<TeamRating>> {
                self.inner.top_ratings(limit)
            }

            fn team_count(&self) -> crate::error::Result<usize> {
                self.inner.team_count()
            }

            fn begin_run(&mut self) -> crate::error::Result<()> {
                self.inner.begin_run()
            }

            fn commit_run(&mut self) -> crate::error::Result<()> {
                Err(ReplayError::StoreFailure {
                    message: "database is locked".to_string(),
                }
                .into())
            }

            fn abort_run(&mut self) -> crate::error::Result<()> {
                self.aborts += 1;
                self.inner.abort_run()
            }
        }

        let mut store = LockedStore::default();
        let engine = engine();

        let err = engine
            .replay(&mut store, vec![MatchOutcome::new(1, 1, 2)], &NoNames)
            .unwrap_err();

        assert!(format!("{err:#}").contains("database is locked"));
        assert_eq!(store.aborts, 1);
        assert!(!store.inner.in_run());
        // the released store accepts the next run
        let err = engine
            .replay(&mut store, vec![MatchOutcome::new(2, 1, 2)], &NoNames)
            .unwrap_err();
        assert!(format!("{err:#}").contains("database is locked"));
        assert_eq!(store.aborts, 2);
    }

    #[test]
    fn test_source_failure_aborts_run() {
        struct BrokenSource;

        impl MatchEventSource for BrokenSource {
            fn fetch_outcomes(
                &self,
                _filter: &EventFilter,
            ) -> crate::error::Result<Vec<MatchOutcome>> {
                Err(anyhow::anyhow!("connection refused"))
            }
        }

        let mut store = InMemoryRatingStore::new();
        store.insert(TeamRating::new(1, "A".to_string(), 1400));

        let err = engine()
            .run(&mut store, &BrokenSource, &EventFilter::default(), &NoNames)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReplayError>(),
            Some(ReplayError::SourceFailure { .. })
        ));
        // the aborted run leaves the previous ratings in place
        assert_eq!(rating_of(&store, 1), 1400);
    }

    #[test]
    fn test_run_applies_filter() {
        let source = InMemoryEventSource::new(vec![
            MatchOutcome::new(1, 1, 2),
            MatchOutcome::new(2, 2, 1),
            MatchOutcome::new(3, 1, 2),
        ]);
        let mut store = InMemoryRatingStore::new();

        let summary = engine()
            .run(&mut store, &source, &EventFilter::after(2), &NoNames)
            .unwrap();

        assert_eq!(summary.events_applied, 1);
        assert_eq!(summary.last_match_id, Some(3));
        assert_eq!(rating_of(&store, 1), 1225);
    }

    #[test]
    fn test_empty_history() {
        let mut store = InMemoryRatingStore::new();
        store.insert(TeamRating::new(1, "A".to_string(), 1600));

        let summary = engine()
            .replay(&mut store, Vec::new(), &NoNames)
            .unwrap();

        assert_eq!(summary.events_applied, 0);
        assert_eq!(summary.last_match_id, None);
        assert_eq!(rating_of(&store, 1), 1200);
    }
}
