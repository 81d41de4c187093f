//! Full-history rating replay
//!
//! This module provides the match event source interface and the engine
//! that folds the ordered match history into team ratings.

pub mod engine;
pub mod source;

// Re-export commonly used types
pub use engine::{ReplayEngine, ReplaySummary};
pub use source::{EventFilter, InMemoryEventSource, MatchEventSource};
