//! Heuristic risk scoring.
//!
//! The score is additive and order-independent: start from the user's
//! persisted baseline, add a fixed penalty per triggered heuristic, clamp to
//! 0–100. The caller gathers the trailing-hour counts; this module only does
//! arithmetic.

use serde::{Deserialize, Serialize};

/// Trailing window for velocity heuristics, in minutes.
pub const VELOCITY_WINDOW_MINUTES: i64 = 60;

/// Transactions in the window above which `HighVelocity` fires.
pub const HIGH_VELOCITY_THRESHOLD: usize = 10;

/// Penalty for `HighVelocity`.
pub const HIGH_VELOCITY_PENALTY: u32 = 20;

/// Proposed points above which `HighValueTransaction` fires.
pub const HIGH_VALUE_THRESHOLD: i64 = 500;

/// Penalty for `HighValueTransaction`.
pub const HIGH_VALUE_PENALTY: u32 = 10;

/// Same-type transactions in the window above which
/// `RepeatedTransactionType` fires.
pub const REPEATED_TYPE_THRESHOLD: usize = 5;

/// Penalty for `RepeatedTransactionType`.
pub const REPEATED_TYPE_PENALTY: u32 = 15;

/// Scores at or above this are blocked (persisted as flagged).
pub const BLOCK_THRESHOLD: u8 = 80;

/// Scores at or above this are queued for review.
pub const REVIEW_THRESHOLD: u8 = 50;

/// A triggered heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    /// Too many transactions in the trailing hour.
    HighVelocity,
    /// Unusually large single award.
    HighValueTransaction,
    /// The same action repeated too often in the trailing hour.
    RepeatedTransactionType,
}

/// What the ledger should do with an assessed award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Record as completed.
    Allow,
    /// Record as completed; queue the user for review.
    Review,
    /// Record as flagged; no balance effect.
    Block,
}

impl Recommendation {
    /// Map a clamped score to a recommendation.
    #[must_use]
    pub const fn for_score(score: u8) -> Self {
        if score >= BLOCK_THRESHOLD {
            Self::Block
        } else if score >= REVIEW_THRESHOLD {
            Self::Review
        } else {
            Self::Allow
        }
    }
}

/// Result of scoring one proposed award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Clamped score (0–100).
    pub score: u8,
    /// Heuristics that fired.
    pub flags: Vec<RiskFlag>,
    /// Resulting recommendation.
    pub recommendation: Recommendation,
}

/// Facts the scorer needs about a proposed award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskInputs {
    /// Persisted baseline score for the user.
    pub baseline: u8,
    /// Transactions in the trailing window, including the proposed one.
    pub recent_count: usize,
    /// Of those, how many share the proposed transaction type.
    pub recent_same_type: usize,
    /// Proposed point amount.
    pub points: i64,
}

/// Score a proposed award.
#[must_use]
pub fn assess(inputs: &RiskInputs) -> RiskAssessment {
    let mut score = u32::from(inputs.baseline);
    let mut flags = Vec::new();

    if inputs.recent_count > HIGH_VELOCITY_THRESHOLD {
        score += HIGH_VELOCITY_PENALTY;
        flags.push(RiskFlag::HighVelocity);
    }
    if inputs.points > HIGH_VALUE_THRESHOLD {
        score += HIGH_VALUE_PENALTY;
        flags.push(RiskFlag::HighValueTransaction);
    }
    if inputs.recent_same_type > REPEATED_TYPE_THRESHOLD {
        score += REPEATED_TYPE_PENALTY;
        flags.push(RiskFlag::RepeatedTransactionType);
    }

    let score = u8::try_from(score.min(100)).unwrap_or(100);

    RiskAssessment {
        score,
        flags,
        recommendation: Recommendation::for_score(score),
    }
}
