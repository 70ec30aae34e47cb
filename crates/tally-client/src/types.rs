//! Request and response types for the tally client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{
    EventId, LeaderboardEntry, RiskFlag, Timeframe, TransactionStatus, TransactionType, UserId,
    VerificationLevel,
};

/// A point-earning action to report.
#[derive(Debug, Clone, Serialize)]
pub struct AwardPointsRequest {
    /// The user who acted.
    pub user_id: UserId,
    /// The event the action relates to (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// What the user did.
    pub transaction_type: TransactionType,
    /// Base amount; the service's rule decides when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    /// Human-readable reason.
    pub description: String,
    /// Additional metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Idempotency key. Retrying with the same key never awards twice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
    /// Verification tier the caller vouches for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_level: Option<VerificationLevel>,
}

impl AwardPointsRequest {
    /// A request for the rule's base amount.
    #[must_use]
    pub fn new(
        user_id: UserId,
        transaction_type: TransactionType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            event_id: None,
            transaction_type,
            points: None,
            description: description.into(),
            metadata: None,
            dedup_key: None,
            verification_level: None,
        }
    }

    /// Relate the action to an event.
    #[must_use]
    pub fn for_event(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    /// Request a specific base amount.
    #[must_use]
    pub fn with_points(mut self, points: i64) -> Self {
        self.points = Some(points);
        self
    }

    /// Attach an idempotency key.
    #[must_use]
    pub fn with_dedup_key(mut self, dedup_key: impl Into<String>) -> Self {
        self.dedup_key = Some(dedup_key.into());
        self
    }
}

/// A user's balance.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// The owning user.
    pub user_id: UserId,
    /// Spendable points.
    pub total_points: i64,
    /// Points ever earned.
    pub lifetime_points: i64,
    /// Current level.
    pub current_level: u32,
    /// Points earned within the current level.
    pub level_progress: u32,
    /// Points still needed for the next level.
    pub points_to_next_level: u32,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

/// One ledger row.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Related event.
    pub event_id: Option<EventId>,
    /// What the user did.
    pub transaction_type: TransactionType,
    /// Points credited (negative for debits).
    pub points_earned: i64,
    /// Description.
    pub description: String,
    /// Caller context.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Risk score at the time of the award.
    pub risk_score: u8,
    /// Whether the row counts toward the balance.
    pub status: TransactionStatus,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

/// An unlocked achievement.
#[derive(Debug, Clone, Deserialize)]
pub struct AchievementResponse {
    /// Achievement key (e.g. `event_creator`).
    pub achievement_type: String,
    /// Display name.
    pub achievement_name: String,
    /// Display description.
    pub description: String,
    /// Bonus points attached.
    pub points_earned: i64,
    /// When it was unlocked.
    pub achieved_at: DateTime<Utc>,
}

/// Result of an award.
#[derive(Debug, Clone, Deserialize)]
pub struct AwardResponse {
    /// The ledger row.
    pub transaction: TransactionResponse,
    /// Balance after the award and its bonuses, if the user has one.
    pub balance: Option<BalanceResponse>,
    /// Achievements unlocked.
    #[serde(default)]
    pub achievements: Vec<AchievementResponse>,
    /// Bonus rows credited for those achievements.
    #[serde(default)]
    pub bonus_transactions: Vec<TransactionResponse>,
    /// Heuristics the award tripped.
    #[serde(default)]
    pub risk_flags: Vec<RiskFlag>,
    /// `true` when an earlier award with the same dedup key was returned.
    #[serde(default)]
    pub replayed: bool,
}

/// A page of ledger rows.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// A user's achievements.
#[derive(Debug, Clone, Deserialize)]
pub struct ListAchievementsResponse {
    /// Achievements (oldest first).
    pub achievements: Vec<AchievementResponse>,
}

/// A ranked leaderboard.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardResponse {
    /// The ranked window.
    pub timeframe: Timeframe,
    /// Ranked rows, best first.
    pub entries: Vec<LeaderboardEntry>,
}

/// Verification signal.
#[derive(Debug, Clone, Serialize)]
pub struct RecordVerificationRequest {
    /// The verified user.
    pub user_id: UserId,
    /// The tier reached.
    pub verification_level: VerificationLevel,
}

/// The parts of a security profile services may read.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationResponse {
    /// The owning user.
    pub user_id: UserId,
    /// Highest verification tier recorded.
    pub verification_level: VerificationLevel,
}

/// API error response format.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// API error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
