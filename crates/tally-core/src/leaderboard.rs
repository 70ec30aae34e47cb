//! Leaderboard ranking.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::level::calculate_level;
use crate::UserId;

/// Most entries a single leaderboard request may return.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Time window a leaderboard covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Trailing 7 days.
    Week,
    /// Trailing 30 days.
    Month,
    /// Everything, read from balances.
    #[default]
    All,
}

impl Timeframe {
    /// Start of the window ending at `now`, or `None` for all time.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => Some(now - Duration::days(30)),
            Self::All => None,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "all" => Ok(Self::All),
            other => Err(format!("unknown timeframe: {other}")),
        }
    }
}

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    /// The ranked user.
    pub user_id: UserId,
    /// Points for the timeframe.
    pub points: i64,
    /// Level shown alongside the points.
    pub level: u32,
}

/// Rank `(user, points, level)` rows: points descending, then user id
/// ascending so ties come out the same way every time.
#[must_use]
pub fn rank(mut rows: Vec<(UserId, i64, u32)>, limit: usize) -> Vec<LeaderboardEntry> {
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows.into_iter()
        .take(limit.clamp(1, MAX_LEADERBOARD_LIMIT))
        .enumerate()
        .map(|(index, (user_id, points, level))| LeaderboardEntry {
            rank: index + 1,
            user_id,
            points,
            level,
        })
        .collect()
}

/// Rank windowed sums; the level shown is derived from the windowed sum.
#[must_use]
pub fn rank_windowed(
    totals: impl IntoIterator<Item = (UserId, i64)>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let rows = totals
        .into_iter()
        .map(|(user_id, points)| (user_id, points, calculate_level(points).level))
        .collect();
    rank(rows, limit)
}
