//! Key encoding for `RocksDB` column families.
//!
//! All ids are fixed-width 16-byte values, so composite keys can be split
//! by offset. Transaction ids are ULIDs: any key ending in one sorts by time
//! within its prefix.

use chrono::{DateTime, Utc};
use tally_core::{EventId, TransactionId, UserId};

/// Width of every id in a key.
pub const ID_LEN: usize = 16;

/// Key for per-user records (balances, security profiles).
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Key for a ledger row.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Seek key for the first ledger row created at or after `since`.
#[must_use]
pub fn transactions_since_key(since: DateTime<Utc>) -> Vec<u8> {
    transaction_key(&TransactionId::lower_bound_at(since))
}

/// `user_id || transaction_id`
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN * 2);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Seek key for a user's rows created at or after `since`.
#[must_use]
pub fn user_transactions_since_key(user_id: &UserId, since: DateTime<Utc>) -> Vec<u8> {
    user_transaction_key(user_id, &TransactionId::lower_bound_at(since))
}

/// `user_id || event_id || transaction_id`
#[must_use]
pub fn user_event_transaction_key(
    user_id: &UserId,
    event_id: &EventId,
    transaction_id: &TransactionId,
) -> Vec<u8> {
    let mut key = user_event_prefix(user_id, event_id);
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// `user_id || event_id`
#[must_use]
pub fn user_event_prefix(user_id: &UserId, event_id: &EventId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN * 3);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(event_id.as_bytes());
    key
}

/// `user_id || dedup_key`
#[must_use]
pub fn dedup_key(user_id: &UserId, dedup_key: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN + dedup_key.len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(dedup_key.as_bytes());
    key
}

/// `user_id || achievement_type`
#[must_use]
pub fn achievement_key(user_id: &UserId, achievement_type: &str) -> Vec<u8> {
    dedup_key(user_id, achievement_type)
}

/// The transaction id at the end of an index key.
///
/// Returns `None` if the key is shorter than one id.
#[must_use]
pub fn trailing_transaction_id(key: &[u8]) -> Option<TransactionId> {
    let start = key.len().checked_sub(ID_LEN)?;
    let bytes: [u8; ID_LEN] = key[start..].try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_transaction_key_layout() {
        let user_id = UserId::generate();
        let tx_id = TransactionId::generate();
        let key = user_transaction_key(&user_id, &tx_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], user_id.as_bytes());
        assert_eq!(trailing_transaction_id(&key), Some(tx_id));
    }

    #[test]
    fn user_event_key_layout() {
        let user_id = UserId::generate();
        let event_id = EventId::generate();
        let tx_id = TransactionId::generate();
        let key = user_event_transaction_key(&user_id, &event_id, &tx_id);

        assert_eq!(key.len(), 48);
        assert!(key.starts_with(&user_event_prefix(&user_id, &event_id)));
        assert_eq!(trailing_transaction_id(&key), Some(tx_id));
    }

    #[test]
    fn since_key_sorts_before_newer_rows() {
        let user_id = UserId::generate();
        let seek = user_transactions_since_key(&user_id, Utc::now() - chrono::Duration::hours(1));
        let key = user_transaction_key(&user_id, &TransactionId::generate());
        assert!(seek < key);
    }

    #[test]
    fn short_key_has_no_transaction_id() {
        assert_eq!(trailing_transaction_id(&[1, 2, 3]), None);
    }
}
