//! One-time achievements.
//!
//! Achievements are unique per `(user, achievement_type)`. Evaluation here is
//! pure: it looks at one completed award and says which milestones it
//! crossed. Whether the user already holds one is the store's business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::BalanceChange;
use crate::transaction::TransactionType;
use crate::UserId;

/// Lifetime total that unlocks "Point Collector".
pub const POINT_COLLECTOR_THRESHOLD: i64 = 1_000;

/// A milestone a user can unlock once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementKind {
    /// Created a first event.
    EventCreator,
    /// Reached 1000 lifetime points.
    PointCollector,
    /// Reached the given level.
    LevelAchiever(u32),
}

impl AchievementKind {
    /// Stable key used for the uniqueness constraint.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::EventCreator => "event_creator".to_string(),
            Self::PointCollector => "point_collector".to_string(),
            Self::LevelAchiever(level) => format!("level_{level}_achiever"),
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::EventCreator => "Event Creator".to_string(),
            Self::PointCollector => "Point Collector".to_string(),
            Self::LevelAchiever(level) => format!("Level {level} Achiever"),
        }
    }

    /// Display description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::EventCreator => "Created your first event".to_string(),
            Self::PointCollector => {
                format!("Earned {POINT_COLLECTOR_THRESHOLD} lifetime points")
            }
            Self::LevelAchiever(level) => format!("Reached level {level}"),
        }
    }

    /// Bonus points credited on unlock.
    #[must_use]
    pub fn bonus_points(&self) -> i64 {
        match self {
            Self::EventCreator => 25,
            Self::PointCollector => 50,
            Self::LevelAchiever(level) => 10 * i64::from(*level),
        }
    }
}

/// An unlocked achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    /// The owning user.
    pub user_id: UserId,

    /// Uniqueness key, see [`AchievementKind::key`].
    pub achievement_type: String,

    /// Display name.
    pub achievement_name: String,

    /// Display description.
    pub description: String,

    /// Bonus points attached.
    pub points_earned: i64,

    /// Context about the unlocking award.
    pub metadata: serde_json::Value,

    /// When it was unlocked.
    pub achieved_at: DateTime<Utc>,
}

impl Achievement {
    /// Build an achievement record for `kind`.
    #[must_use]
    pub fn unlock(user_id: UserId, kind: AchievementKind, metadata: serde_json::Value) -> Self {
        Self {
            user_id,
            achievement_type: kind.key(),
            achievement_name: kind.name(),
            description: kind.description(),
            points_earned: kind.bonus_points(),
            metadata,
            achieved_at: Utc::now(),
        }
    }
}

/// Milestone candidates after one completed award.
///
/// The rules are independent of each other and look at the balance the
/// award produced:
/// - any `event_create` award is a candidate for "Event Creator";
/// - 1000 or more lifetime points is a candidate for "Point Collector";
/// - a level above 1 is a candidate for "Level N Achiever", N being the
///   level after the award.
///
/// The store's uniqueness constraint drops candidates the user already
/// holds, so each milestone is credited on the first award that reaches it.
/// A milestone reached by a bonus row that was not itself evaluated is
/// credited on the user's next completed award.
#[must_use]
pub fn evaluate(transaction_type: TransactionType, change: &BalanceChange) -> Vec<AchievementKind> {
    let mut unlocked = Vec::new();

    if transaction_type == TransactionType::EventCreate {
        unlocked.push(AchievementKind::EventCreator);
    }

    if change.after.lifetime_points >= POINT_COLLECTOR_THRESHOLD {
        unlocked.push(AchievementKind::PointCollector);
    }

    if change.after.current_level > 1 {
        unlocked.push(AchievementKind::LevelAchiever(change.after.current_level));
    }

    unlocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Balance;

    fn change(before: i64, delta: i64) -> BalanceChange {
        let mut balance = Balance::new(UserId::generate());
        balance.apply(before).unwrap();
        let before = balance.clone();
        balance.apply(delta).unwrap();
        BalanceChange {
            before,
            after: balance,
        }
    }

    #[test]
    fn event_create_unlocks_creator() {
        let kinds = evaluate(TransactionType::EventCreate, &change(0, 50));
        assert_eq!(kinds, vec![AchievementKind::EventCreator]);
    }

    #[test]
    fn crossing_one_thousand_unlocks_collector_and_level() {
        let kinds = evaluate(TransactionType::EventCheckin, &change(990, 20));
        assert_eq!(
            kinds,
            vec![
                AchievementKind::PointCollector,
                AchievementKind::LevelAchiever(11)
            ]
        );
    }

    #[test]
    fn level_one_unlocks_nothing() {
        assert!(evaluate(TransactionType::EventShare, &change(10, 20)).is_empty());
    }

    #[test]
    fn candidates_follow_the_resulting_balance() {
        // Already past both milestones: the store decides whether they are new.
        let kinds = evaluate(TransactionType::EventCheckin, &change(1_000, 5));
        assert_eq!(
            kinds,
            vec![
                AchievementKind::PointCollector,
                AchievementKind::LevelAchiever(11)
            ]
        );
    }

    #[test]
    fn multi_level_jump_names_the_new_level() {
        let kinds = evaluate(TransactionType::Referral, &change(50, 300));
        assert_eq!(kinds, vec![AchievementKind::LevelAchiever(4)]);
        assert_eq!(AchievementKind::LevelAchiever(4).bonus_points(), 40);
    }

    #[test]
    fn keys_and_names() {
        assert_eq!(AchievementKind::LevelAchiever(7).key(), "level_7_achiever");
        assert_eq!(AchievementKind::LevelAchiever(7).name(), "Level 7 Achiever");
        assert_eq!(AchievementKind::EventCreator.bonus_points(), 25);
        assert_eq!(AchievementKind::PointCollector.bonus_points(), 50);
    }
}
