//! ELO rating update
//!
//! Computes the outcome of a single win/loss event. The loser's new rating
//! is derived from the winner's so that every update is exactly zero-sum.

use crate::config::rating::EloConfig;
use serde::{Deserialize, Serialize};

/// Result of applying one match outcome to a pair of ratings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloUpdate {
    pub winner_before: i64,
    pub loser_before: i64,
    pub winner_after: i64,
    pub loser_after: i64,
    /// Rating points moved from the loser to the winner
    pub delta: i64,
    pub expected_win: f64,
}

/// Expected-score term for the winner of a match.
///
/// NOTE: the exponent is `winner - loser`, not `loser - winner` as in the
/// textbook formula, so a favourite that wins gains more than an underdog
/// that wins. Reference ratings depend on this exact sign; do not flip it.
pub fn expected_win(winner_rating: i64, loser_rating: i64) -> f64 {
    let gap = (winner_rating - loser_rating) as f64;
    1.0 / (1.0 + 10f64.powf(gap / 400.0))
}

/// Round to the nearest integer, ties toward positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor as i64 + 1
    } else {
        floor as i64
    }
}

/// Fixed-K ELO calculator
#[derive(Debug, Clone, Copy)]
pub struct EloCalculator {
    k_factor: i64,
}

impl EloCalculator {
    pub fn new(config: &EloConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self {
            k_factor: config.k_factor,
        })
    }

    pub fn k_factor(&self) -> i64 {
        self.k_factor
    }

    /// Apply a win by `winner_rating` over `loser_rating`
    pub fn update(&self, winner_rating: i64, loser_rating: i64) -> EloUpdate {
        let expected = expected_win(winner_rating, loser_rating);
        let delta = round_half_up(self.k_factor as f64 * (1.0 - expected));

        let winner_after = winner_rating + delta;
        let loser_after = loser_rating + winner_rating - winner_after;

        EloUpdate {
            winner_before: winner_rating,
            loser_before: loser_rating,
            winner_after,
            loser_after,
            delta,
            expected_win: expected,
        }
    }
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self {
            k_factor: EloConfig::default().k_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calculator(k_factor: i64) -> EloCalculator {
        EloCalculator::new(&EloConfig::new(1200, k_factor)).unwrap()
    }

    #[test]
    fn test_equal_ratings() {
        let update = EloCalculator::default().update(1200, 1200);

        assert_eq!(update.expected_win, 0.5);
        assert_eq!(update.delta, 25);
        assert_eq!(update.winner_after, 1225);
        assert_eq!(update.loser_after, 1175);
    }

    #[test]
    fn test_underdog_win() {
        let update = EloCalculator::default().update(1000, 1400);

        assert!((update.expected_win - 0.909_090_909).abs() < 1e-6);
        assert_eq!(update.delta, 5);
        assert_eq!(update.winner_after, 1005);
        assert_eq!(update.loser_after, 1395);
    }

    #[test]
    fn test_favourite_win_uses_winner_minus_loser_exponent() {
        // 10^((1400 - 1000) / 400) = 10, so expected_win = 1/11
        let update = EloCalculator::default().update(1400, 1000);

        assert!((update.expected_win - 1.0 / 11.0).abs() < 1e-12);
        assert_eq!(update.delta, 45);
        assert_eq!(update.winner_after, 1445);
        assert_eq!(update.loser_after, 955);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(0.5), 1);
        assert_eq!(round_half_up(1.5), 2);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(4.55), 5);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
        assert_eq!(round_half_up(7.0), 7);
    }

    #[test]
    fn test_tie_rounds_up_in_update() {
        // K * (1 - 0.5) is exactly x.5 for odd K
        let update = calculator(1).update(1200, 1200);
        assert_eq!(update.delta, 1);

        let update = calculator(51).update(1500, 1500);
        assert_eq!(update.delta, 26);
        assert_eq!(update.winner_after, 1526);
        assert_eq!(update.loser_after, 1474);
    }

    #[test]
    fn test_rejects_invalid_k() {
        assert!(EloCalculator::new(&EloConfig::new(1200, 0)).is_err());
    }

    #[test]
    fn test_rejects_overflowing_parameters() {
        assert!(EloCalculator::new(&EloConfig::new(i64::MAX, 50)).is_err());
        assert!(EloCalculator::new(&EloConfig::new(1200, i64::MAX)).is_err());
    }

    proptest! {
        #[test]
        fn prop_update_is_zero_sum(
            winner in -5_000i64..5_000,
            loser in -5_000i64..5_000,
            k in 1i64..200,
        ) {
            let update = calculator(k).update(winner, loser);
            prop_assert_eq!(
                update.winner_after + update.loser_after,
                winner + loser
            );
        }

        #[test]
        fn prop_delta_bounded_by_k(
            winner in -5_000i64..5_000,
            loser in -5_000i64..5_000,
            k in 1i64..200,
        ) {
            let update = calculator(k).update(winner, loser);
            prop_assert!(update.delta >= 0);
            prop_assert!(update.delta <= k);
        }

        #[test]
        fn prop_round_half_up_is_nearest(value in -1.0e6f64..1.0e6) {
            let rounded = round_half_up(value) as f64;
            prop_assert!((rounded - value).abs() <= 0.5);
        }
    }
}
