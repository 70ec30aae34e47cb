//! Error types for tally storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A debit would take the spendable balance below zero.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Current spendable points.
        balance: i64,
        /// Points the debit needs.
        required: i64,
    },

    /// The transaction's points would push the balance out of range.
    #[error(transparent)]
    PointsOverflow(#[from] tally_core::PointsOverflow),

    /// The user already holds this achievement.
    #[error("achievement already awarded: {achievement_type}")]
    DuplicateAchievement {
        /// The achievement key.
        achievement_type: String,
    },

    /// A transaction with this idempotency key already exists.
    #[error("duplicate transaction: {dedup_key}")]
    DuplicateTransaction {
        /// The repeated key.
        dedup_key: String,
    },
}
