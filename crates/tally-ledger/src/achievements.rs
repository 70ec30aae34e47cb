//! Achievement unlocking.

use std::sync::Arc;

use tally_core::achievement::evaluate;
use tally_core::{Achievement, BalanceChange, Transaction};
use tally_store::{Store, StoreError};

/// Records the achievements a completed award unlocks.
pub struct AchievementEvaluator {
    store: Arc<dyn Store>,
}

impl AchievementEvaluator {
    /// Create an evaluator over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Insert every achievement `transaction` newly unlocks and return them.
    ///
    /// Achievements the user already holds are skipped. Other failures are
    /// logged and skipped; they never fail the award that triggered them.
    pub fn unlock(&self, transaction: &Transaction, change: &BalanceChange) -> Vec<Achievement> {
        let metadata = serde_json::json!({
            "transaction_id": transaction.id.to_string(),
            "transaction_type": transaction.transaction_type.as_str(),
            "lifetime_points": change.after.lifetime_points,
        });

        let mut unlocked = Vec::new();
        for kind in evaluate(transaction.transaction_type, change) {
            let achievement = Achievement::unlock(transaction.user_id, kind, metadata.clone());
            match self.store.insert_achievement(&achievement) {
                Ok(()) => {
                    tracing::info!(
                        user_id = %transaction.user_id,
                        achievement = %achievement.achievement_type,
                        "Achievement unlocked"
                    );
                    unlocked.push(achievement);
                }
                Err(StoreError::DuplicateAchievement { achievement_type }) => {
                    tracing::debug!(
                        user_id = %transaction.user_id,
                        achievement = %achievement_type,
                        "Achievement already held"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %transaction.user_id,
                        achievement = %achievement.achievement_type,
                        error = %e,
                        "Failed to record achievement"
                    );
                }
            }
        }
        unlocked
    }
}
