//! # Leveling
//!
//! Translation of streamed experience into level, current experience and the
//! experience required for the next level.
//!
//! The curve is not a closed-form formula. It is a simulation that walks
//! forward level by level, each level costing the base `max_exp` plus 50 more
//! than the previous one. Clients run the same walk locally to predict level
//! ups, so the accumulation order below must not change.

use serde::{Deserialize, Serialize};

/// Extra experience each successive level costs on top of the last.
pub const LEVEL_STEP: f64 = 50.0;

/// Largest single experience grant accepted from a client.
///
/// The leveling walk is linear in the number of levels gained, so an
/// unbounded grant would stall the connection task.
pub const MAX_STREAMED_EXP: f64 = 1_000_000_000.0;

/// The leveling-relevant subset of a player profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub level: i32,
    pub current_exp: f64,
    pub max_exp: f64,
    pub total_exp: f64,
}

/// Returns `true` if `streamed` can be fed to [`apply_experience`].
pub fn is_valid_streamed(streamed: f64) -> bool {
    streamed.is_finite() && (0.0..=MAX_STREAMED_EXP).contains(&streamed)
}

/// Applies `streamed` experience to `progress`.
///
/// # Arguments
///
/// * `progress` - Progress before the grant
/// * `streamed` - Experience gained; callers should check it with
///   [`is_valid_streamed`] first
///
/// # Returns
///
/// The new progress. `total_exp` always grows by exactly `streamed`.
///
/// # Examples
///
/// ```rust
/// use bitrealm_engine::leveling::{apply_experience, PlayerProgress};
///
/// let before = PlayerProgress { level: 1, current_exp: 90.0, max_exp: 100.0, total_exp: 90.0 };
/// let after = apply_experience(before, 20.0);
///
/// assert_eq!(after.level, 2);
/// assert_eq!(after.current_exp, 10.0);
/// assert_eq!(after.max_exp, 150.0);
/// assert_eq!(after.total_exp, 110.0);
/// ```
pub fn apply_experience(progress: PlayerProgress, streamed: f64) -> PlayerProgress {
    let total_exp = progress.total_exp + streamed;
    let total_after = progress.current_exp + streamed;

    if total_after < progress.max_exp {
        return PlayerProgress {
            current_exp: total_after,
            total_exp,
            ..progress
        };
    }

    let mut buffer = progress.max_exp;
    let mut limit_exp = progress.max_exp;
    let mut levels_gained: i32 = 0;

    while total_after > buffer {
        levels_gained += 1;
        let step = LEVEL_STEP * f64::from(levels_gained);
        limit_exp += step;
        buffer += progress.max_exp + step;
    }

    PlayerProgress {
        level: progress.level + levels_gained,
        current_exp: limit_exp - (buffer - total_after),
        max_exp: limit_exp,
        total_exp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(level: i32, current_exp: f64, max_exp: f64, total_exp: f64) -> PlayerProgress {
        PlayerProgress {
            level,
            current_exp,
            max_exp,
            total_exp,
        }
    }

    #[test]
    fn test_grant_below_threshold_keeps_level() {
        let after = apply_experience(progress(3, 10.0, 200.0, 500.0), 50.0);
        assert_eq!(after, progress(3, 60.0, 200.0, 550.0));
    }

    #[test]
    fn test_single_level_up() {
        let after = apply_experience(progress(1, 90.0, 100.0, 90.0), 20.0);
        assert_eq!(after, progress(2, 10.0, 150.0, 110.0));
    }

    #[test]
    fn test_reaching_threshold_exactly_does_not_level() {
        let after = apply_experience(progress(1, 90.0, 100.0, 90.0), 10.0);
        assert_eq!(after, progress(1, 100.0, 100.0, 100.0));
    }

    #[test]
    fn test_multiple_levels_in_one_grant() {
        // buffer walks 100 -> 250 -> 450; limit walks 100 -> 150 -> 250.
        let after = apply_experience(progress(1, 0.0, 100.0, 0.0), 300.0);
        assert_eq!(after.level, 3);
        assert_eq!(after.max_exp, 250.0);
        assert_eq!(after.current_exp, 250.0 - (450.0 - 300.0));
        assert_eq!(after.total_exp, 300.0);
    }

    #[test]
    fn test_zero_grant_is_identity() {
        let before = progress(7, 33.0, 400.0, 4000.0);
        assert_eq!(apply_experience(before, 0.0), before);
    }

    #[test]
    fn test_invariants_hold_over_a_grid() {
        for max_exp in [1.0, 50.0, 100.0, 1234.5] {
            for current_ratio in [0.0, 0.25, 0.5, 0.99, 1.0] {
                for streamed in [0.0, 0.5, 1.0, 49.0, 100.0, 999.0, 25_000.0, 1.0e6] {
                    let before = progress(4, max_exp * current_ratio, max_exp, 10_000.0);
                    let after = apply_experience(before, streamed);

                    assert!(after.current_exp >= 0.0, "{before:?} + {streamed}");
                    assert!(after.current_exp <= after.max_exp, "{before:?} + {streamed}");
                    assert!(after.level >= before.level);
                    assert_eq!(after.total_exp, before.total_exp + streamed);
                }
            }
        }
    }

    #[test]
    fn test_streamed_validation() {
        assert!(is_valid_streamed(0.0));
        assert!(is_valid_streamed(20.0));
        assert!(!is_valid_streamed(-1.0));
        assert!(!is_valid_streamed(f64::NAN));
        assert!(!is_valid_streamed(f64::INFINITY));
        assert!(!is_valid_streamed(MAX_STREAMED_EXP * 2.0));
    }
}
