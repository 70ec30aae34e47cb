//! Column families used by the `RocksDB` backend.

/// Column family names.
pub mod cf {
    /// Balance projections, keyed by `user_id`.
    pub const BALANCES: &str = "balances";

    /// Ledger rows, keyed by `transaction_id` (ULID, so time-ordered).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: `user_id || transaction_id`. Value is empty.
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Index: `user_id || event_id || transaction_id`. Value is empty.
    pub const TRANSACTIONS_BY_USER_EVENT: &str = "transactions_by_user_event";

    /// Index: `user_id || dedup_key`. Value is the transaction id.
    pub const TRANSACTIONS_BY_DEDUP_KEY: &str = "transactions_by_dedup_key";

    /// Security profiles, keyed by `user_id`.
    pub const SECURITY_PROFILES: &str = "security_profiles";

    /// Achievements, keyed by `user_id || achievement_type`.
    pub const ACHIEVEMENTS: &str = "achievements";
}

/// Every column family, for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::BALANCES,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::TRANSACTIONS_BY_USER_EVENT,
        cf::TRANSACTIONS_BY_DEDUP_KEY,
        cf::SECURITY_PROFILES,
        cf::ACHIEVEMENTS,
    ]
}
