//! Risk assessment against recent ledger activity.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tally_core::risk::{assess, VELOCITY_WINDOW_MINUTES};
use tally_core::{RiskAssessment, RiskInputs, SecurityProfile, TransactionType};
use tally_store::Store;

use crate::error::Result;

/// Scores proposed awards from the user's trailing-hour activity.
pub struct RiskAssessor {
    store: Arc<dyn Store>,
}

impl RiskAssessor {
    /// Create an assessor over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Score a proposed award of `points` for the profile's user.
    ///
    /// The trailing-hour counts include every status and the proposed
    /// transaction itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the recent-activity query fails.
    pub fn assess(
        &self,
        profile: &SecurityProfile,
        transaction_type: TransactionType,
        points: i64,
        now: DateTime<Utc>,
    ) -> Result<RiskAssessment> {
        let since = now - Duration::minutes(VELOCITY_WINDOW_MINUTES);
        let recent = self
            .store
            .list_user_transactions_since(&profile.user_id, since)?;

        let same_type = recent
            .iter()
            .filter(|tx| tx.transaction_type == transaction_type)
            .count();

        let assessment = assess(&RiskInputs {
            baseline: profile.risk_score,
            recent_count: recent.len() + 1,
            recent_same_type: same_type + 1,
            points,
        });

        tracing::debug!(
            user_id = %profile.user_id,
            score = assessment.score,
            flags = ?assessment.flags,
            recommendation = ?assessment.recommendation,
            "Assessed award risk"
        );

        Ok(assessment)
    }
}
