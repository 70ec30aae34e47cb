//! In-memory storage implementation.
//!
//! Everything sits behind one `RwLock`, so each trait call is atomic with
//! respect to every other. Suitable for tests and single-node development.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tally_core::{
    Achievement, Balance, BalanceChange, EventId, SecurityProfile, Transaction, TransactionId,
    UserId,
};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Default)]
struct Tables {
    balances: HashMap<UserId, Balance>,
    transactions: BTreeMap<TransactionId, Transaction>,
    dedup_keys: HashMap<(UserId, String), TransactionId>,
    profiles: HashMap<UserId, SecurityProfile>,
    achievements: BTreeMap<(UserId, String), Achievement>,
}

/// Storage held entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn get_balance(&self, user_id: &UserId) -> Result<Option<Balance>> {
        Ok(self.read().balances.get(user_id).cloned())
    }

    fn put_balance(&self, balance: &Balance) -> Result<()> {
        self.write()
            .balances
            .insert(balance.user_id, balance.clone());
        Ok(())
    }

    fn list_balances(&self) -> Result<Vec<Balance>> {
        Ok(self.read().balances.values().cloned().collect())
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        Ok(self.read().transactions.get(transaction_id).cloned())
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        Ok(self
            .read()
            .transactions
            .values()
            .rev()
            .filter(|tx| tx.user_id == *user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_user_transactions_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        Ok(self
            .read()
            .transactions
            .values()
            .filter(|tx| tx.user_id == *user_id && tx.created_at >= since)
            .cloned()
            .collect())
    }

    fn list_user_event_transactions(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<Vec<Transaction>> {
        Ok(self
            .read()
            .transactions
            .values()
            .filter(|tx| tx.user_id == *user_id && tx.event_id.as_ref() == Some(event_id))
            .cloned()
            .collect())
    }

    fn list_transactions_since(&self, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        Ok(self
            .read()
            .transactions
            .values()
            .filter(|tx| tx.created_at >= since)
            .cloned()
            .collect())
    }

    fn find_transaction_by_dedup_key(
        &self,
        user_id: &UserId,
        dedup_key: &str,
    ) -> Result<Option<Transaction>> {
        let tables = self.read();
        Ok(tables
            .dedup_keys
            .get(&(*user_id, dedup_key.to_string()))
            .and_then(|id| tables.transactions.get(id))
            .cloned())
    }

    fn get_security_profile(&self, user_id: &UserId) -> Result<Option<SecurityProfile>> {
        Ok(self.read().profiles.get(user_id).cloned())
    }

    fn put_security_profile(&self, profile: &SecurityProfile) -> Result<()> {
        self.write()
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    fn insert_achievement(&self, achievement: &Achievement) -> Result<()> {
        let key = (achievement.user_id, achievement.achievement_type.clone());
        let mut tables = self.write();
        if tables.achievements.contains_key(&key) {
            return Err(StoreError::DuplicateAchievement {
                achievement_type: achievement.achievement_type.clone(),
            });
        }
        tables.achievements.insert(key, achievement.clone());
        Ok(())
    }

    fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        let mut achievements: Vec<_> = self
            .read()
            .achievements
            .values()
            .filter(|a| a.user_id == *user_id)
            .cloned()
            .collect();
        achievements.sort_by_key(|a| a.achieved_at);
        Ok(achievements)
    }

    fn commit_transaction(&self, transaction: &Transaction) -> Result<Option<BalanceChange>> {
        let mut tables = self.write();

        let dedup = transaction
            .dedup_key
            .as_ref()
            .map(|key| (transaction.user_id, key.clone()));
        if let Some(dedup) = &dedup {
            if tables.dedup_keys.contains_key(dedup) {
                return Err(StoreError::DuplicateTransaction {
                    dedup_key: dedup.1.clone(),
                });
            }
        }

        let change = if transaction.is_completed() {
            let before = tables
                .balances
                .get(&transaction.user_id)
                .cloned()
                .unwrap_or_else(|| Balance::new(transaction.user_id));

            if !before.can_apply(transaction.points_earned) {
                return Err(StoreError::InsufficientPoints {
                    balance: before.total_points,
                    required: transaction.points_earned.saturating_neg(),
                });
            }

            let mut after = before.clone();
            after.apply(transaction.points_earned)?;
            tables.balances.insert(transaction.user_id, after.clone());
            Some(BalanceChange { before, after })
        } else {
            None
        };

        if let Some(dedup) = dedup {
            tables.dedup_keys.insert(dedup, transaction.id);
        }
        tables
            .transactions
            .insert(transaction.id, transaction.clone());

        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{TransactionStatus, TransactionType};

    fn award(user_id: UserId, points: i64) -> Transaction {
        Transaction::new(user_id, None, TransactionType::EventCheckin, points, "Checked in".into())
    }

    #[test]
    fn completed_commit_projects_balance() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();

        let change = store.commit_transaction(&award(user_id, 30)).unwrap().unwrap();
        assert_eq!(change.before.total_points, 0);
        assert_eq!(change.after.total_points, 30);

        let balance = store.get_balance(&user_id).unwrap().unwrap();
        assert_eq!(balance.lifetime_points, 30);
    }

    #[test]
    fn flagged_commit_leaves_balance_alone() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        let tx = award(user_id, 30).with_risk(90, TransactionStatus::Flagged);

        assert!(store.commit_transaction(&tx).unwrap().is_none());
        assert!(store.get_balance(&user_id).unwrap().is_none());
        assert_eq!(store.list_transactions_by_user(&user_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn overdraft_is_rejected_without_writing() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store.commit_transaction(&award(user_id, 10)).unwrap();

        let debit = Transaction::new(
            user_id,
            None,
            TransactionType::AdminAdjustment,
            -11,
            "Correction".into(),
        );
        assert!(matches!(
            store.commit_transaction(&debit),
            Err(StoreError::InsufficientPoints {
                balance: 10,
                required: 11
            })
        ));
        assert_eq!(store.list_transactions_by_user(&user_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn overflowing_commit_is_rejected_without_writing() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store.commit_transaction(&award(user_id, i64::MAX)).unwrap();

        assert!(matches!(
            store.commit_transaction(&award(user_id, 1)),
            Err(StoreError::PointsOverflow(_))
        ));
        assert_eq!(store.list_transactions_by_user(&user_id, 10, 0).unwrap().len(), 1);
        assert_eq!(store.get_balance(&user_id).unwrap().unwrap().total_points, i64::MAX);
    }

    #[test]
    fn dedup_key_is_enforced_per_user() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        let first = award(user_id, 10).with_dedup_key(Some("checkin-1".into()));
        store.commit_transaction(&first).unwrap();

        let again = award(user_id, 10).with_dedup_key(Some("checkin-1".into()));
        assert!(matches!(
            store.commit_transaction(&again),
            Err(StoreError::DuplicateTransaction { .. })
        ));

        let other_user = award(UserId::generate(), 10).with_dedup_key(Some("checkin-1".into()));
        assert!(store.commit_transaction(&other_user).is_ok());

        let found = store
            .find_transaction_by_dedup_key(&user_id, "checkin-1")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[test]
    fn achievements_are_unique() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        let achievement = Achievement::unlock(
            user_id,
            tally_core::AchievementKind::EventCreator,
            serde_json::Value::Null,
        );

        store.insert_achievement(&achievement).unwrap();
        assert!(matches!(
            store.insert_achievement(&achievement),
            Err(StoreError::DuplicateAchievement { .. })
        ));
        assert_eq!(store.list_achievements(&user_id).unwrap().len(), 1);
    }

    #[test]
    fn event_sums_only_count_completed_rows_of_the_type() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        let event_id = EventId::generate();

        let checkin = |points| {
            Transaction::new(
                user_id,
                Some(event_id),
                TransactionType::EventCheckin,
                points,
                "Checked in".into(),
            )
        };
        store.commit_transaction(&checkin(20)).unwrap();
        store
            .commit_transaction(&checkin(20).with_risk(95, TransactionStatus::Flagged))
            .unwrap();
        store
            .commit_transaction(&Transaction::new(
                user_id,
                Some(event_id),
                TransactionType::EventShare,
                5,
                "Shared".into(),
            ))
            .unwrap();

        let sum = store
            .sum_completed_for_event(&user_id, &event_id, TransactionType::EventCheckin)
            .unwrap();
        assert_eq!(sum, 20);
    }
}
