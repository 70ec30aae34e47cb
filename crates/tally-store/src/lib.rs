//! Storage layer for tally.
//!
//! Four logical tables back the points ledger:
//!
//! - **balances**: one projection per user
//! - **transactions**: the append-only ledger, indexed by
//!   `(user, created_at)`, `(user, event)` and `(user, dedup_key)`
//! - **security profiles**: one per user
//! - **achievements**: unique per `(user, achievement_type)`
//!
//! Two backends implement [`Store`]: [`MemoryStore`] (always available) and
//! `RocksStore` (behind the `rocksdb-backend` feature).
//!
//! # Example
//!
//! ```
//! use tally_core::{Transaction, TransactionType, UserId};
//! use tally_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//! let tx = Transaction::new(user_id, None, TransactionType::EventShare, 5, "Shared".into());
//!
//! let change = store.commit_transaction(&tx).unwrap().unwrap();
//! assert_eq!(change.after.total_points, 5);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use tally_core::{
    Achievement, Balance, BalanceChange, EventId, SecurityProfile, Transaction, TransactionId,
    TransactionType, UserId,
};

/// The storage trait defining all database operations.
///
/// Implementations must make [`Store::commit_transaction`] atomic: the
/// ledger row, its indexes and the balance projection land together or not
/// at all, and concurrent commits for one user never lose an update.
pub trait Store: Send + Sync {
    // =========================================================================
    // Balances
    // =========================================================================

    /// Get a user's balance projection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_balance(&self, user_id: &UserId) -> Result<Option<Balance>>;

    /// Overwrite a balance projection (reconciliation only).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_balance(&self, balance: &Balance) -> Result<()>;

    /// Every balance projection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_balances(&self) -> Result<Vec<Balance>>;

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Get a ledger row by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>>;

    /// A page of a user's rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>>;

    /// A user's rows created at or after `since`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_user_transactions_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;

    /// A user's rows for one event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_user_event_transactions(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<Vec<Transaction>>;

    /// Every user's rows created at or after `since`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_since(&self, since: DateTime<Utc>) -> Result<Vec<Transaction>>;

    /// Look up a row by the caller's idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_transaction_by_dedup_key(
        &self,
        user_id: &UserId,
        dedup_key: &str,
    ) -> Result<Option<Transaction>>;

    /// Completed points of one type a user earned since `since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn sum_completed_since(
        &self,
        user_id: &UserId,
        transaction_type: TransactionType,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        Ok(self
            .list_user_transactions_since(user_id, since)?
            .iter()
            .filter(|tx| tx.is_completed() && tx.transaction_type == transaction_type)
            .fold(0_i64, |sum, tx| sum.saturating_add(tx.points_earned)))
    }

    /// Completed points of one type a user earned for an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn sum_completed_for_event(
        &self,
        user_id: &UserId,
        event_id: &EventId,
        transaction_type: TransactionType,
    ) -> Result<i64> {
        Ok(self
            .list_user_event_transactions(user_id, event_id)?
            .iter()
            .filter(|tx| tx.is_completed() && tx.transaction_type == transaction_type)
            .fold(0_i64, |sum, tx| sum.saturating_add(tx.points_earned)))
    }

    // =========================================================================
    // Security profiles
    // =========================================================================

    /// Get a user's security profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_security_profile(&self, user_id: &UserId) -> Result<Option<SecurityProfile>>;

    /// Insert or update a security profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_security_profile(&self, profile: &SecurityProfile) -> Result<()>;

    // =========================================================================
    // Achievements
    // =========================================================================

    /// Record an achievement.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateAchievement` if the user already holds it.
    fn insert_achievement(&self, achievement: &Achievement) -> Result<()>;

    /// A user's achievements, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Append a ledger row and, if it is completed, project it onto the
    /// user's balance (creating the balance on first use), atomically.
    ///
    /// Returns the balance before and after for completed rows, `None`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateTransaction` if the row's dedup key was used.
    /// - `StoreError::InsufficientPoints` if a debit would overdraw.
    fn commit_transaction(&self, transaction: &Transaction) -> Result<Option<BalanceChange>>;
}
