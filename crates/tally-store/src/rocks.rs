//! `RocksDB` storage implementation.
//!
//! Values are CBOR. Every multi-key write goes through a `WriteBatch`, and
//! read-modify-write sequences hold `write_lock` so two commits for the same
//! user cannot interleave between the balance read and the batch write.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use tally_core::{
    Achievement, Balance, BalanceChange, EventId, SecurityProfile, Transaction, TransactionId,
    UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(path = %path.display(), "Opened RocksDB store");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        family: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_value<T: serde::Serialize>(&self, family: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(family)?;
        let value = Self::serialize(value)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Index keys in `family` that start with `prefix`, beginning at `from`.
    fn scan_index(&self, family: &str, prefix: &[u8], from: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(family)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(from, Direction::Forward));

        let mut found = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            found.push(key.to_vec());
        }
        Ok(found)
    }

    fn load_transactions<'a>(
        &self,
        index_keys: impl IntoIterator<Item = &'a Vec<u8>>,
    ) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();
        for key in index_keys {
            let Some(tx_id) = keys::trailing_transaction_id(key) else {
                continue;
            };
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Balances
    // =========================================================================

    fn get_balance(&self, user_id: &UserId) -> Result<Option<Balance>> {
        self.get_value(cf::BALANCES, &keys::user_key(user_id))
    }

    fn put_balance(&self, balance: &Balance) -> Result<()> {
        let _guard = self.lock();
        self.put_value(cf::BALANCES, &keys::user_key(&balance.user_id), balance)
    }

    fn list_balances(&self) -> Result<Vec<Balance>> {
        let cf = self.cf(cf::BALANCES)?;
        let mut balances = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            balances.push(Self::deserialize(&value)?);
        }
        Ok(balances)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        self.get_value(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let prefix = keys::user_key(user_id);
        let index = self.scan_index(cf::TRANSACTIONS_BY_USER, &prefix, &prefix)?;
        self.load_transactions(index.iter().rev().skip(offset).take(limit))
    }

    fn list_user_transactions_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let prefix = keys::user_key(user_id);
        let from = keys::user_transactions_since_key(user_id, since);
        let index = self.scan_index(cf::TRANSACTIONS_BY_USER, &prefix, &from)?;
        let mut transactions = self.load_transactions(&index)?;
        transactions.retain(|tx| tx.created_at >= since);
        Ok(transactions)
    }

    fn list_user_event_transactions(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<Vec<Transaction>> {
        let prefix = keys::user_event_prefix(user_id, event_id);
        let index = self.scan_index(cf::TRANSACTIONS_BY_USER_EVENT, &prefix, &prefix)?;
        self.load_transactions(&index)
    }

    fn list_transactions_since(&self, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let from = keys::transactions_since_key(since);
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&from, Direction::Forward));

        let mut transactions = Vec::new();
        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let tx: Transaction = Self::deserialize(&value)?;
            if tx.created_at >= since {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    fn find_transaction_by_dedup_key(
        &self,
        user_id: &UserId,
        dedup_key: &str,
    ) -> Result<Option<Transaction>> {
        let cf = self.cf(cf::TRANSACTIONS_BY_DEDUP_KEY)?;
        let Some(raw) = self
            .db
            .get_cf(&cf, keys::dedup_key(user_id, dedup_key))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        match keys::trailing_transaction_id(&raw) {
            Some(tx_id) => self.get_transaction(&tx_id),
            None => Err(StoreError::Serialization(format!(
                "malformed dedup index entry for {dedup_key}"
            ))),
        }
    }

    // =========================================================================
    // Security profiles
    // =========================================================================

    fn get_security_profile(&self, user_id: &UserId) -> Result<Option<SecurityProfile>> {
        self.get_value(cf::SECURITY_PROFILES, &keys::user_key(user_id))
    }

    fn put_security_profile(&self, profile: &SecurityProfile) -> Result<()> {
        self.put_value(cf::SECURITY_PROFILES, &keys::user_key(&profile.user_id), profile)
    }

    // =========================================================================
    // Achievements
    // =========================================================================

    fn insert_achievement(&self, achievement: &Achievement) -> Result<()> {
        let key = keys::achievement_key(&achievement.user_id, &achievement.achievement_type);
        let _guard = self.lock();

        if self
            .get_value::<Achievement>(cf::ACHIEVEMENTS, &key)?
            .is_some()
        {
            return Err(StoreError::DuplicateAchievement {
                achievement_type: achievement.achievement_type.clone(),
            });
        }
        self.put_value(cf::ACHIEVEMENTS, &key, achievement)
    }

    fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        let cf = self.cf(cf::ACHIEVEMENTS)?;
        let prefix = keys::user_key(user_id);
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut achievements: Vec<Achievement> = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            achievements.push(Self::deserialize(&value)?);
        }
        achievements.sort_by_key(|a| a.achieved_at);
        Ok(achievements)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn commit_transaction(&self, transaction: &Transaction) -> Result<Option<BalanceChange>> {
        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let cf_by_event = self.cf(cf::TRANSACTIONS_BY_USER_EVENT)?;
        let cf_by_dedup = self.cf(cf::TRANSACTIONS_BY_DEDUP_KEY)?;

        let _guard = self.lock();
        let mut batch = WriteBatch::default();

        if let Some(dedup) = &transaction.dedup_key {
            let dedup_key = keys::dedup_key(&transaction.user_id, dedup);
            let exists = self
                .db
                .get_cf(&cf_by_dedup, &dedup_key)
                .map_err(|e| StoreError::Database(e.to_string()))?
                .is_some();
            if exists {
                return Err(StoreError::DuplicateTransaction {
                    dedup_key: dedup.clone(),
                });
            }
            batch.put_cf(&cf_by_dedup, &dedup_key, transaction.id.to_bytes());
        }

        let change = if transaction.is_completed() {
            let before = self
                .get_balance(&transaction.user_id)?
                .unwrap_or_else(|| Balance::new(transaction.user_id));

            if !before.can_apply(transaction.points_earned) {
                return Err(StoreError::InsufficientPoints {
                    balance: before.total_points,
                    required: transaction.points_earned.saturating_neg(),
                });
            }

            let mut after = before.clone();
            after.apply(transaction.points_earned)?;
            batch.put_cf(
                &cf_balances,
                keys::user_key(&transaction.user_id),
                Self::serialize(&after)?,
            );
            Some(BalanceChange { before, after })
        } else {
            None
        };

        batch.put_cf(
            &cf_tx,
            keys::transaction_key(&transaction.id),
            Self::serialize(transaction)?,
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_transaction_key(&transaction.user_id, &transaction.id),
            [],
        );
        if let Some(event_id) = &transaction.event_id {
            batch.put_cf(
                &cf_by_event,
                keys::user_event_transaction_key(&transaction.user_id, event_id, &transaction.id),
                [],
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(change)
    }
}
