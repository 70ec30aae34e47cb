//! Per-user serialization of balance mutations.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_core::UserId;

/// Lock slots in a default table.
pub const DEFAULT_LOCK_SLOTS: usize = 256;

/// A fixed table of mutexes, one picked per user by hash.
///
/// Awards for the same user always land on the same slot and run one at a
/// time. Users that share a slot are serialized with each other as well.
/// The table does not grow with the user count.
pub struct UserLocks {
    slots: Box<[Mutex<()>]>,
    hasher: RandomState,
}

impl UserLocks {
    /// A table with [`DEFAULT_LOCK_SLOTS`] slots.
    #[must_use]
    pub fn new() -> Self {
        Self::with_slots(DEFAULT_LOCK_SLOTS)
    }

    /// A table with `slots` slots (at least one).
    #[must_use]
    pub fn with_slots(slots: usize) -> Self {
        Self {
            slots: (0..slots.max(1)).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    /// Block until `user_id`'s slot is held.
    pub fn lock(&self, user_id: &UserId) -> MutexGuard<'_, ()> {
        self.slot(user_id)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, user_id: &UserId) -> &Mutex<()> {
        let hash = self.hasher.hash_one(user_id);
        let index = usize::try_from(hash % self.slots.len() as u64).unwrap_or_default();
        &self.slots[index]
    }
}

impl Default for UserLocks {
    fn default() -> Self {
        Self::new()
    }
}
