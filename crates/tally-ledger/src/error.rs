//! Error types for award orchestration.

use tally_core::{TransactionType, VerificationLevel};
use tally_store::StoreError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors returned by [`crate::PointsLedger`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No active rule for the transaction type. Indicates misconfiguration.
    #[error("no active rule for transaction type {0}")]
    RuleMissing(TransactionType),

    /// The user's verification tier is below what the rule requires.
    #[error("verification level {required} required, user has {actual}")]
    VerificationRequired {
        /// Tier the rule requires.
        required: VerificationLevel,
        /// Tier the user holds.
        actual: VerificationLevel,
    },

    /// The daily cap for this transaction type would be exceeded.
    #[error("daily limit of {limit} exceeded: earned {earned}, requested {requested}")]
    DailyLimitExceeded {
        /// The configured cap.
        limit: i64,
        /// Points already earned today.
        earned: i64,
        /// Points requested.
        requested: i64,
    },

    /// The per-event cap for this transaction type would be exceeded.
    #[error("event limit of {limit} exceeded: earned {earned}, requested {requested}")]
    EventLimitExceeded {
        /// The configured cap.
        limit: i64,
        /// Points already earned for the event.
        earned: i64,
        /// Points requested.
        requested: i64,
    },

    /// The requested amount is not valid for the transaction type.
    #[error("invalid points: {0}")]
    InvalidPoints(String),

    /// A debit would take the spendable balance below zero.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Current spendable points.
        balance: i64,
        /// Points the debit needs.
        required: i64,
    },

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The backing store failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl LedgerError {
    /// Whether this is an expected, user-facing rejection rather than a
    /// fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::RuleMissing(_) | Self::Persistence(_))
    }
}
