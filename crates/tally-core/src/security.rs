//! Per-user security profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::risk::{RiskAssessment, RiskFlag, Recommendation};
use crate::UserId;

/// Ordered trust tier supplied by the identity provider.
///
/// The derive order is the trust order: `None < Email < ... < Kyc`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    /// Nothing verified.
    #[default]
    None,
    /// Email address confirmed.
    Email,
    /// Phone number confirmed.
    Phone,
    /// Linked social account.
    Social,
    /// Government id checked.
    Id,
    /// Full know-your-customer check.
    Kyc,
}

impl VerificationLevel {
    /// The snake_case wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Social => "social",
            Self::Id => "id",
            Self::Kyc => "kyc",
        }
    }
}

impl fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "social" => Ok(Self::Social),
            "id" => Ok(Self::Id),
            "kyc" => Ok(Self::Kyc),
            other => Err(format!("unknown verification level: {other}")),
        }
    }
}

/// Operator review state for a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualReviewStatus {
    /// No review requested.
    #[default]
    None,
    /// Queued for an operator.
    Pending,
    /// Operator cleared the user.
    Approved,
    /// Operator confirmed abuse.
    Rejected,
}

/// Risk and trust state for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityProfile {
    /// The owning user.
    pub user_id: UserId,

    /// Persisted baseline risk score (0–100). Assessments start here.
    pub risk_score: u8,

    /// Highest verification tier seen. Never lowered.
    pub verification_level: VerificationLevel,

    /// Every flag any assessment has raised.
    pub red_flags: BTreeSet<RiskFlag>,

    /// Operator review state.
    pub manual_review_status: ManualReviewStatus,

    /// Score produced by the most recent assessment.
    pub last_assessed_score: Option<u8>,

    /// When the most recent assessment ran.
    pub last_assessed_at: Option<DateTime<Utc>>,

    /// When the profile last changed.
    pub updated_at: DateTime<Utc>,
}

impl SecurityProfile {
    /// A clean profile: zero baseline, unverified.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            risk_score: 0,
            verification_level: VerificationLevel::None,
            red_flags: BTreeSet::new(),
            manual_review_status: ManualReviewStatus::None,
            last_assessed_score: None,
            last_assessed_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Raise the verification tier. Returns `true` if it changed.
    pub fn raise_verification(&mut self, level: VerificationLevel) -> bool {
        if level <= self.verification_level {
            return false;
        }
        self.verification_level = level;
        self.updated_at = Utc::now();
        true
    }

    /// Fold an assessment into the profile.
    ///
    /// Flags accumulate; the baseline score is left alone. A `review` or
    /// `block` recommendation queues the user for manual review unless an
    /// operator already decided.
    pub fn record_assessment(&mut self, assessment: &RiskAssessment) {
        self.red_flags.extend(assessment.flags.iter().copied());
        self.last_assessed_score = Some(assessment.score);
        self.last_assessed_at = Some(Utc::now());

        if assessment.recommendation != Recommendation::Allow
            && self.manual_review_status == ManualReviewStatus::None
        {
            self.manual_review_status = ManualReviewStatus::Pending;
        }
        self.updated_at = Utc::now();
    }
}
