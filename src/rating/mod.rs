//! ELO rating arithmetic and rating storage
//!
//! This module provides the fixed-K update calculation and the storage
//! interface with in-memory and SQLite implementations.

pub mod calculator;
pub mod sqlite;
pub mod storage;

// Re-export commonly used types
pub use calculator::{expected_win, round_half_up, EloCalculator, EloUpdate};
pub use sqlite::SqliteRatingStore;
pub use storage::{InMemoryRatingStore, RatingStore};
