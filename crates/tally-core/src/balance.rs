//! Point balance projection.
//!
//! A `Balance` is a denormalized view over a user's completed transactions.
//! It is created lazily on the first completed award and only ever moved by
//! [`Balance::apply`] (or rebuilt wholesale during reconciliation).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::{calculate_level, LevelInfo};
use crate::UserId;

/// A user's point balance.
///
/// Invariants: `total_points <= lifetime_points`, and `current_level` /
/// `level_progress` always equal [`calculate_level`] of `lifetime_points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The owning user.
    pub user_id: UserId,

    /// Spendable points.
    pub total_points: i64,

    /// Points ever earned. Never decreases.
    pub lifetime_points: i64,

    /// Level derived from `lifetime_points`.
    pub current_level: u32,

    /// Points earned within the current level (0–99).
    pub level_progress: u32,

    /// When the balance was first projected.
    pub created_at: DateTime<Utc>,

    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// An empty balance at level 1.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            total_points: 0,
            lifetime_points: 0,
            current_level: 1,
            level_progress: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a completed transaction's points.
    ///
    /// Positive amounts raise both totals. Negative amounts (adjustments)
    /// only reduce the spendable total; lifetime points are not clawed back.
    ///
    /// # Errors
    ///
    /// Returns [`PointsOverflow`] and leaves the balance untouched if either
    /// total would leave the `i64` range.
    pub fn apply(&mut self, points: i64) -> Result<(), PointsOverflow> {
        let overflow = PointsOverflow {
            current: self.lifetime_points,
            points,
        };
        let total = self.total_points.checked_add(points).ok_or(overflow)?;
        let lifetime = if points > 0 {
            self.lifetime_points.checked_add(points).ok_or(overflow)?
        } else {
            self.lifetime_points
        };

        self.total_points = total;
        self.lifetime_points = lifetime;
        self.refresh_level();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether `points` can be applied without the spendable total going
    /// below zero.
    #[must_use]
    pub const fn can_apply(&self, points: i64) -> bool {
        points >= 0 || self.total_points + points >= 0
    }

    /// Level information for the current lifetime total.
    #[must_use]
    pub fn level(&self) -> LevelInfo {
        calculate_level(self.lifetime_points)
    }

    /// Overwrite both totals, e.g. when rebuilding from the ledger.
    pub fn reset_totals(&mut self, total_points: i64, lifetime_points: i64) {
        self.total_points = total_points;
        self.lifetime_points = lifetime_points;
        self.refresh_level();
        self.updated_at = Utc::now();
    }

    fn refresh_level(&mut self) {
        let info = calculate_level(self.lifetime_points);
        self.current_level = info.level;
        self.level_progress = info.progress;
    }
}

/// A transaction whose points would push a balance out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("points overflow: {points} cannot be added to a lifetime total of {current}")]
pub struct PointsOverflow {
    /// Lifetime points before the transaction.
    pub current: i64,
    /// Points the transaction carries.
    pub points: i64,
}

/// A balance before and after a single committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// State before the commit (a fresh balance if none existed).
    pub before: Balance,
    /// State after the commit.
    pub after: Balance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_award_moves_both_totals() {
        let mut balance = Balance::new(UserId::generate());
        balance.apply(250).unwrap();

        assert_eq!(balance.total_points, 250);
        assert_eq!(balance.lifetime_points, 250);
        assert_eq!(balance.current_level, 3);
        assert_eq!(balance.level_progress, 50);
    }

    #[test]
    fn negative_adjustment_keeps_lifetime() {
        let mut balance = Balance::new(UserId::generate());
        balance.apply(150).unwrap();
        balance.apply(-120).unwrap();

        assert_eq!(balance.total_points, 30);
        assert_eq!(balance.lifetime_points, 150);
        assert_eq!(balance.current_level, 2);
        assert!(balance.total_points <= balance.lifetime_points);
    }

    #[test]
    fn can_apply_guards_overdraft() {
        let mut balance = Balance::new(UserId::generate());
        balance.apply(40).unwrap();

        assert!(balance.can_apply(-40));
        assert!(!balance.can_apply(-41));
        assert!(balance.can_apply(1_000));
    }

    #[test]
    fn overflow_is_rejected_without_change() {
        let mut balance = Balance::new(UserId::generate());
        balance.apply(i64::MAX).unwrap();
        let before = balance.clone();

        assert_eq!(
            balance.apply(1),
            Err(PointsOverflow {
                current: i64::MAX,
                points: 1
            })
        );
        assert_eq!(balance, before);

        // Debits still work at the top of the range.
        balance.apply(-5).unwrap();
        assert_eq!(balance.total_points, i64::MAX - 5);
        assert_eq!(balance.lifetime_points, i64::MAX);
    }
}
