//! Ledger transaction types.
//!
//! Every point movement is an immutable `Transaction` row. Corrections are
//! new offsetting rows, never edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{EventId, TransactionId, UserId};

/// An append-only ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique, time-ordered id.
    pub id: TransactionId,

    /// The user credited or debited.
    pub user_id: UserId,

    /// The event this action relates to, if any.
    pub event_id: Option<EventId>,

    /// What kind of action earned the points.
    pub transaction_type: TransactionType,

    /// Signed point amount. Negative only for adjustments.
    pub points_earned: i64,

    /// Human-readable description.
    pub description: String,

    /// Opaque caller context (attendee counts, referral codes, ...).
    pub metadata: serde_json::Value,

    /// Risk score snapshot at write time (0–100).
    pub risk_score: u8,

    /// Lifecycle status. Only `Completed` rows count toward a balance.
    pub status: TransactionStatus,

    /// Caller-supplied idempotency key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,

    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a new row stamped with a fresh id. `created_at` is the id's
    /// timestamp.
    #[must_use]
    pub fn new(
        user_id: UserId,
        event_id: Option<EventId>,
        transaction_type: TransactionType,
        points_earned: i64,
        description: String,
    ) -> Self {
        let id = TransactionId::generate();
        Self {
            id,
            user_id,
            event_id,
            transaction_type,
            points_earned,
            description,
            metadata: serde_json::Value::Null,
            risk_score: 0,
            status: TransactionStatus::Completed,
            dedup_key: None,
            created_at: id.timestamp(),
        }
    }

    /// Attach caller metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Record the risk score and resulting status.
    #[must_use]
    pub fn with_risk(mut self, risk_score: u8, status: TransactionStatus) -> Self {
        self.risk_score = risk_score;
        self.status = status;
        self
    }

    /// Attach an idempotency key.
    #[must_use]
    pub fn with_dedup_key(mut self, dedup_key: Option<String>) -> Self {
        self.dedup_key = dedup_key;
        self
    }

    /// Whether this row contributes to the balance.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

/// Category of point-earning action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// The user created an event.
    EventCreate,

    /// The user checked in at an event.
    EventCheckin,

    /// The user registered for an event.
    EventRegister,

    /// The user shared an event.
    EventShare,

    /// The user referred someone who signed up.
    Referral,

    /// Bonus attached to a newly unlocked achievement.
    AchievementBonus,

    /// Operator correction; may be negative.
    AdminAdjustment,
}

impl TransactionType {
    /// Every transaction type, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::EventCreate,
        Self::EventCheckin,
        Self::EventRegister,
        Self::EventShare,
        Self::Referral,
        Self::AchievementBonus,
        Self::AdminAdjustment,
    ];

    /// The snake_case wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EventCreate => "event_create",
            Self::EventCheckin => "event_checkin",
            Self::EventRegister => "event_register",
            Self::EventShare => "event_share",
            Self::Referral => "referral",
            Self::AchievementBonus => "achievement_bonus",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }

    /// Whether point amounts are scaled by verification and risk.
    ///
    /// System bonuses and operator adjustments are credited at face value.
    #[must_use]
    pub const fn is_multiplied(&self) -> bool {
        !matches!(self, Self::AchievementBonus | Self::AdminAdjustment)
    }

    /// Whether the amount may be negative.
    #[must_use]
    pub const fn allows_negative(&self) -> bool {
        matches!(self, Self::AdminAdjustment)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| UnknownTransactionType(s.to_string()))
    }
}

/// Returned when parsing an unrecognised transaction type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction type: {0}")]
pub struct UnknownTransactionType(pub String);

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Counted toward the balance.
    Completed,
    /// Awaiting a decision; not counted.
    Pending,
    /// Voided before completion; not counted.
    Cancelled,
    /// Recorded for audit because risk recommended blocking; not counted.
    Flagged,
}
