//! Match event source interface
//!
//! Sources deliver match outcomes already ordered by ascending match id.
//! The engine relies on that order and never re-sorts.

use crate::types::{MatchId, MatchOutcome};
use serde::{Deserialize, Serialize};

/// Selection criteria applied by a source before delivery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Exclusive lower bound on the match id
    pub min_match_id: Option<MatchId>,
    /// Inclusive lower bound on the match status
    pub min_status: Option<i64>,
    /// Required league tier
    pub league_tier: Option<i64>,
}

impl EventFilter {
    /// Filter with only a match id floor
    pub fn after(min_match_id: MatchId) -> Self {
        Self {
            min_match_id: Some(min_match_id),
            ..Self::default()
        }
    }

    pub fn admits_match_id(&self, match_id: MatchId) -> bool {
        self.min_match_id.map_or(true, |floor| match_id > floor)
    }
}

/// Trait for retrieving the ordered match history
pub trait MatchEventSource {
    /// Fetch all outcomes selected by `filter`, ascending by match id
    fn fetch_outcomes(&self, filter: &EventFilter) -> crate::error::Result<Vec<MatchOutcome>>;
}

/// Source over a fixed list of outcomes.
///
/// Outcomes are delivered in the order given; only the match id floor of
/// the filter applies since the list carries no status or league.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSource {
    outcomes: Vec<MatchOutcome>,
}

impl InMemoryEventSource {
    pub fn new(outcomes: Vec<MatchOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn push(&mut self, outcome: MatchOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl From<Vec<MatchOutcome>> for InMemoryEventSource {
    fn from(outcomes: Vec<MatchOutcome>) -> Self {
        Self::new(outcomes)
    }
}

impl MatchEventSource for InMemoryEventSource {
    fn fetch_outcomes(&self, filter: &EventFilter) -> crate::error::Result<Vec<MatchOutcome>> {
        Ok(self
            .outcomes
            .iter()
            .filter(|outcome| filter.admits_match_id(outcome.match_id))
            .copied()
            .collect())
    }
}
