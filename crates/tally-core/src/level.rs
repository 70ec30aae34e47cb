//! Level derivation.
//!
//! Levels are a pure function of lifetime points. Nothing here touches the
//! ledger, so read paths can call it freely.

use serde::{Deserialize, Serialize};

/// Points needed to advance one level.
pub const POINTS_PER_LEVEL: i64 = 100;

/// A user's position on the level ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    /// Current level, starting at 1.
    pub level: u32,
    /// Points earned within the current level (0–99).
    pub progress: u32,
    /// Points still needed to reach the next level.
    pub points_to_next_level: u32,
}

/// Compute the level for a lifetime point total.
///
/// Negative totals (possible only for windowed leaderboard sums) clamp to
/// level 1 with no progress.
#[must_use]
pub fn calculate_level(lifetime_points: i64) -> LevelInfo {
    let points = lifetime_points.max(0);
    let level = u32::try_from(points / POINTS_PER_LEVEL + 1).unwrap_or(u32::MAX);
    let progress = u32::try_from(points % POINTS_PER_LEVEL).unwrap_or(0);

    LevelInfo {
        level: level.max(1),
        progress,
        points_to_next_level: 100 - progress,
    }
}
