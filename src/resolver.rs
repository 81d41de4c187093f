//! Display name lookup for teams created during a replay

use crate::types::TeamId;
use std::collections::HashMap;

/// Resolves the display name of a team.
///
/// Only consulted the first time a team is seen. An unknown team is not an
/// error; implementations return `None` and the record gets an empty name.
pub trait NameResolver {
    fn resolve_name(&self, team_id: TeamId) -> Option<String>;
}

impl<F> NameResolver for F
where
    F: Fn(TeamId) -> Option<String>,
{
    fn resolve_name(&self, team_id: TeamId) -> Option<String> {
        self(team_id)
    }
}

/// Resolver that never knows any name
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNames;

impl NameResolver for NoNames {
    fn resolve_name(&self, _team_id: TeamId) -> Option<String> {
        None
    }
}

/// Resolver backed by a fixed map
#[derive(Debug, Default, Clone)]
pub struct StaticNameResolver {
    names: HashMap<TeamId, String>,
}

impl StaticNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, team_id: TeamId, name: impl Into<String>) -> Self {
        self.names.insert(team_id, name.into());
        self
    }
}

impl FromIterator<(TeamId, String)> for StaticNameResolver {
    fn from_iter<I: IntoIterator<Item = (TeamId, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

impl NameResolver for StaticNameResolver {
    fn resolve_name(&self, team_id: TeamId) -> Option<String> {
        self.names.get(&team_id).cloned()
    }
}
