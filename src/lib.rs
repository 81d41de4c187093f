//! ELO replay - team ratings from a historical match log
//!
//! This crate recomputes team ratings by resetting a rating store and
//! replaying every decided match in ascending match id order, then reports
//! the highest-rated teams.

pub mod config;
pub mod dataset;
pub mod error;
pub mod rating;
pub mod replay;
pub mod report;
pub mod resolver;
pub mod types;

// Re-export commonly used types and traits
pub use error::{ReplayError, Result};
pub use types::*;

// Re-export key components
pub use rating::{InMemoryRatingStore, RatingStore, SqliteRatingStore};
pub use replay::{EventFilter, MatchEventSource, ReplayEngine, ReplaySummary};
pub use resolver::NameResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
