//! The award pipeline and ledger read operations.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::{
    final_points, Achievement, Balance, BalanceChange, EventId, LeaderboardEntry,
    ManualReviewStatus, Recommendation, RiskAssessment, Rule, RuleStore, SecurityProfile,
    Timeframe, Transaction, TransactionStatus, TransactionType, UserId, VerificationLevel,
};
use tally_store::{Store, StoreError};

use crate::achievements::AchievementEvaluator;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::leaderboard::LeaderboardAggregator;
use crate::limits::LimitEnforcer;
use crate::locks::UserLocks;
use crate::risk::RiskAssessor;

/// A request to award (or, for adjustments, deduct) points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRequest {
    /// The user receiving the points.
    pub user_id: UserId,
    /// The event the action relates to, if any.
    #[serde(default)]
    pub event_id: Option<EventId>,
    /// What the user did.
    pub transaction_type: TransactionType,
    /// Base amount; the rule's `base_points` when absent.
    #[serde(default)]
    pub points: Option<i64>,
    /// Human-readable reason.
    pub description: String,
    /// Caller context stored on the ledger row.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Idempotency key, unique per user.
    #[serde(default)]
    pub dedup_key: Option<String>,
    /// Verification tier asserted by the identity provider.
    #[serde(default)]
    pub verification_level: Option<VerificationLevel>,
}

impl AwardRequest {
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
            metadata: serde_json::Value::Null,
            dedup_key: None,
            verification_level: None,
        }
    }

    /// Relate the award to an event.
    #[must_use]
    pub fn for_event(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    /// Override the rule's base amount.
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

/// What an award did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardOutcome {
    /// The ledger row for the caller's award.
    pub transaction: Transaction,
    /// The user's balance after the award and any bonuses, if one exists.
    pub balance: Option<Balance>,
    /// Achievements unlocked by this award and its bonuses.
    pub achievements: Vec<Achievement>,
    /// Bonus rows credited for those achievements.
    pub bonus_transactions: Vec<Transaction>,
    /// Risk assessment, absent for adjustments and replays.
    pub risk: Option<RiskAssessment>,
    /// `true` when the dedup key matched an earlier award and nothing was
    /// written.
    pub replayed: bool,
}

/// Operator changes to a security profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityUpdate {
    /// New baseline risk score (clamped to 100).
    #[serde(default)]
    pub risk_score: Option<u8>,
    /// New review status.
    #[serde(default)]
    pub manual_review_status: Option<ManualReviewStatus>,
}

/// Result of rebuilding a balance from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// The reconciled user.
    pub user_id: UserId,
    /// The stored projection before reconciliation.
    pub before: Option<Balance>,
    /// The projection recomputed from completed rows.
    pub after: Balance,
    /// Whether the stored projection disagreed and was rewritten.
    pub drifted: bool,
}

/// A bonus waiting to be credited, with the depth of the award that
/// unlocked it.
struct PendingBonus {
    achievement: Achievement,
    depth: u8,
}

/// The points ledger: validates, scores and records awards, and serves the
/// read views over the resulting state.
pub struct PointsLedger {
    store: Arc<dyn Store>,
    rules: Arc<dyn RuleStore>,
    config: LedgerConfig,
    locks: UserLocks,
    risk: RiskAssessor,
    limits: LimitEnforcer,
    achievements: AchievementEvaluator,
    leaderboard: LeaderboardAggregator,
}

impl PointsLedger {
    /// Build a ledger over `store` and `rules`.
    pub fn new(store: Arc<dyn Store>, rules: Arc<dyn RuleStore>, config: LedgerConfig) -> Self {
        Self {
            risk: RiskAssessor::new(Arc::clone(&store)),
            limits: LimitEnforcer::new(Arc::clone(&store), config.fail_open_on_store_error),
            achievements: AchievementEvaluator::new(Arc::clone(&store)),
            leaderboard: LeaderboardAggregator::new(Arc::clone(&store)),
            locks: UserLocks::new(),
            store,
            rules,
            config,
        }
    }

    /// The policy this ledger runs with.
    #[must_use]
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The rule store backing this ledger.
    #[must_use]
    pub fn rules(&self) -> &dyn RuleStore {
        self.rules.as_ref()
    }

    // =========================================================================
    // Awards
    // =========================================================================

    /// Award points for a user action.
    ///
    /// Steps: replay check, rule lookup, verification check, multiplier,
    /// risk assessment, earning caps, atomic commit, then achievements.
    /// A `block` recommendation stores the row as `flagged` with no balance
    /// effect. The whole sequence, bonuses included, holds the user's lock.
    ///
    /// # Errors
    ///
    /// - `LedgerError::RuleMissing` when no active rule exists.
    /// - `LedgerError::VerificationRequired` when the user's tier is too low.
    /// - `LedgerError::InvalidPoints` for a non-positive amount (or zero for
    ///   adjustments), or one that would overflow the balance.
    /// - `LedgerError::DailyLimitExceeded` / `LedgerError::EventLimitExceeded`.
    /// - `LedgerError::InsufficientPoints` when an adjustment would overdraw.
    /// - `LedgerError::Persistence` when the store fails.
    pub fn award(&self, request: AwardRequest) -> Result<AwardOutcome> {
        let _guard = self.locks.lock(&request.user_id);

        if let Some(outcome) = self.replay(&request)? {
            return Ok(outcome);
        }

        let rule = self.rules.get_rule(request.transaction_type).ok_or_else(|| {
            tracing::error!(
                transaction_type = %request.transaction_type,
                "No active rule configured for transaction type"
            );
            LedgerError::RuleMissing(request.transaction_type)
        })?;

        let mut profile = self.load_profile(&request.user_id)?;
        if let Some(level) = request.verification_level {
            if profile.raise_verification(level) {
                self.store.put_security_profile(&profile)?;
            }
        }
        if profile.verification_level < rule.verification_level_required {
            return Err(LedgerError::VerificationRequired {
                required: rule.verification_level_required,
                actual: profile.verification_level,
            });
        }

        let points = Self::points_for(&rule, &request, &profile)?;
        let now = Utc::now();

        let (status, risk) = if request.transaction_type == TransactionType::AdminAdjustment {
            (TransactionStatus::Completed, None)
        } else {
            let assessment = self
                .risk
                .assess(&profile, request.transaction_type, points, now)?;
            let status = if assessment.recommendation == Recommendation::Block {
                TransactionStatus::Flagged
            } else {
                TransactionStatus::Completed
            };
            (status, Some(assessment))
        };

        if points > 0 {
            self.limits
                .check(&rule, &request.user_id, request.event_id.as_ref(), points, now)?;
        }

        // The assessment is recorded only once every check has passed.
        if let Some(assessment) = &risk {
            profile.record_assessment(assessment);
            self.store.put_security_profile(&profile)?;
        }

        let risk_score = risk.as_ref().map_or(profile.risk_score, |r| r.score);
        let transaction = Transaction::new(
            request.user_id,
            request.event_id,
            request.transaction_type,
            points,
            request.description,
        )
        .with_metadata(request.metadata)
        .with_risk(risk_score, status)
        .with_dedup_key(request.dedup_key);

        let change = self.store.commit_transaction(&transaction).map_err(|e| match e {
            StoreError::InsufficientPoints { balance, required } => {
                LedgerError::InsufficientPoints { balance, required }
            }
            StoreError::PointsOverflow(overflow) => LedgerError::InvalidPoints(overflow.to_string()),
            other => LedgerError::Persistence(other),
        })?;

        tracing::info!(
            user_id = %transaction.user_id,
            transaction_id = %transaction.id,
            transaction_type = %transaction.transaction_type,
            points = transaction.points_earned,
            status = ?transaction.status,
            "Points recorded"
        );

        let mut achievements = Vec::new();
        let mut bonus_transactions = Vec::new();
        if let Some(change) = &change {
            self.run_achievements(&transaction, change, &mut achievements, &mut bonus_transactions);
        }

        let balance = self.store.get_balance(&transaction.user_id)?;

        Ok(AwardOutcome {
            transaction,
            balance,
            achievements,
            bonus_transactions,
            risk,
            replayed: false,
        })
    }

    /// Credit or debit points on an operator's behalf.
    ///
    /// Adjustments are credited at face value, never flagged, and may be
    /// negative as long as the spendable total stays at or above zero.
    ///
    /// # Errors
    ///
    /// As [`PointsLedger::award`].
    pub fn adjust(
        &self,
        user_id: UserId,
        points: i64,
        description: impl Into<String>,
        dedup_key: Option<String>,
    ) -> Result<AwardOutcome> {
        let mut request = AwardRequest::new(user_id, TransactionType::AdminAdjustment, description)
            .with_points(points);
        request.dedup_key = dedup_key;
        self.award(request)
    }

    fn replay(&self, request: &AwardRequest) -> Result<Option<AwardOutcome>> {
        let Some(dedup_key) = &request.dedup_key else {
            return Ok(None);
        };
        let Some(transaction) = self
            .store
            .find_transaction_by_dedup_key(&request.user_id, dedup_key)?
        else {
            return Ok(None);
        };

        tracing::debug!(
            user_id = %request.user_id,
            transaction_id = %transaction.id,
            dedup_key = %dedup_key,
            "Replaying award"
        );

        Ok(Some(AwardOutcome {
            balance: self.store.get_balance(&request.user_id)?,
            transaction,
            achievements: Vec::new(),
            bonus_transactions: Vec::new(),
            risk: None,
            replayed: true,
        }))
    }

    fn points_for(rule: &Rule, request: &AwardRequest, profile: &SecurityProfile) -> Result<i64> {
        let base = request.points.unwrap_or(rule.base_points);
        let ty = request.transaction_type;

        if ty.allows_negative() {
            if base == 0 {
                return Err(LedgerError::InvalidPoints(
                    "adjustment amount must be non-zero".into(),
                ));
            }
        } else if base <= 0 {
            return Err(LedgerError::InvalidPoints(format!(
                "{ty} awards must be positive, got {base}"
            )));
        }

        if ty.is_multiplied() {
            Ok(final_points(
                base,
                profile.verification_level,
                profile.risk_score,
            ))
        } else {
            Ok(base)
        }
    }

    /// Unlock achievements for a completed award and credit their bonuses,
    /// breadth first, evaluating only awards shallower than the depth limit.
    fn run_achievements(
        &self,
        transaction: &Transaction,
        change: &BalanceChange,
        achievements: &mut Vec<Achievement>,
        bonus_transactions: &mut Vec<Transaction>,
    ) {
        if self.config.achievement_depth_limit == 0 {
            return;
        }

        let mut queue: VecDeque<PendingBonus> = self
            .achievements
            .unlock(transaction, change)
            .into_iter()
            .map(|achievement| PendingBonus {
                achievement,
                depth: 1,
            })
            .collect();

        while let Some(PendingBonus { achievement, depth }) = queue.pop_front() {
            let bonus = Transaction::new(
                achievement.user_id,
                None,
                TransactionType::AchievementBonus,
                achievement.points_earned,
                format!("Achievement unlocked: {}", achievement.achievement_name),
            )
            .with_metadata(serde_json::json!({
                "achievement_type": achievement.achievement_type,
            }));

            match self.store.commit_transaction(&bonus) {
                Ok(Some(bonus_change)) => {
                    if depth < self.config.achievement_depth_limit {
                        queue.extend(
                            self.achievements
                                .unlock(&bonus, &bonus_change)
                                .into_iter()
                                .map(|achievement| PendingBonus {
                                    achievement,
                                    depth: depth + 1,
                                }),
                        );
                    }
                    bonus_transactions.push(bonus);
                }
                Ok(None) => bonus_transactions.push(bonus),
                Err(e) => {
                    tracing::warn!(
                        user_id = %achievement.user_id,
                        achievement = %achievement.achievement_type,
                        error = %e,
                        "Failed to credit achievement bonus"
                    );
                }
            }
            achievements.push(achievement);
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A user's balance.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotFound` if the user has never been awarded points.
    pub fn balance(&self, user_id: &UserId) -> Result<Balance> {
        self.store
            .get_balance(user_id)?
            .ok_or(LedgerError::NotFound("balance"))
    }

    /// A page of a user's ledger rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        Ok(self.store.list_transactions_by_user(user_id, limit, offset)?)
    }

    /// A user's achievements, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        Ok(self.store.list_achievements(user_id)?)
    }

    /// Ranked users for a timeframe.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn leaderboard(&self, timeframe: Timeframe, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard.leaderboard(timeframe, limit, Utc::now())
    }

    // =========================================================================
    // Security
    // =========================================================================

    /// A user's security profile.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotFound` if no profile exists yet.
    pub fn security_profile(&self, user_id: &UserId) -> Result<SecurityProfile> {
        self.store
            .get_security_profile(user_id)?
            .ok_or(LedgerError::NotFound("security profile"))
    }

    /// Record a verification signal. The tier only ever goes up.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn record_verification(
        &self,
        user_id: UserId,
        level: VerificationLevel,
    ) -> Result<SecurityProfile> {
        let _guard = self.locks.lock(&user_id);

        let mut profile = self.load_profile(&user_id)?;
        if profile.raise_verification(level) {
            self.store.put_security_profile(&profile)?;
            tracing::info!(user_id = %user_id, level = %level, "Verification level raised");
        }
        Ok(profile)
    }

    /// Apply an operator's changes to a security profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn update_security_profile(
        &self,
        user_id: UserId,
        update: SecurityUpdate,
    ) -> Result<SecurityProfile> {
        let _guard = self.locks.lock(&user_id);

        let mut profile = self.load_profile(&user_id)?;
        if let Some(score) = update.risk_score {
            profile.risk_score = score.min(100);
        }
        if let Some(status) = update.manual_review_status {
            profile.manual_review_status = status;
        }
        profile.updated_at = Utc::now();
        self.store.put_security_profile(&profile)?;

        tracing::info!(
            user_id = %user_id,
            risk_score = profile.risk_score,
            review = ?profile.manual_review_status,
            "Security profile updated"
        );
        Ok(profile)
    }

    fn load_profile(&self, user_id: &UserId) -> Result<SecurityProfile> {
        Ok(self
            .store
            .get_security_profile(user_id)?
            .unwrap_or_else(|| SecurityProfile::new(*user_id)))
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Rebuild a user's balance from their completed ledger rows and
    /// rewrite it if the stored projection drifted.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotFound` if the user has neither a balance nor rows.
    /// - `LedgerError::InvalidPoints` if the rows sum past the `i64` range.
    /// - `LedgerError::Persistence` if the store fails.
    pub fn reconcile(&self, user_id: &UserId) -> Result<ReconcileReport> {
        let _guard = self.locks.lock(user_id);

        let rows = self.store.list_transactions_by_user(user_id, usize::MAX, 0)?;
        let before = self.store.get_balance(user_id)?;
        if before.is_none() && rows.is_empty() {
            return Err(LedgerError::NotFound("balance"));
        }

        let mut total = 0_i64;
        let mut lifetime = 0_i64;
        for tx in rows.iter().filter(|tx| tx.is_completed()) {
            total = total
                .checked_add(tx.points_earned)
                .ok_or_else(|| LedgerError::InvalidPoints("ledger total overflows".into()))?;
            lifetime = lifetime
                .checked_add(tx.points_earned.max(0))
                .ok_or_else(|| LedgerError::InvalidPoints("ledger lifetime total overflows".into()))?;
        }

        let mut after = before.clone().unwrap_or_else(|| Balance::new(*user_id));
        let drifted = after.total_points != total || after.lifetime_points != lifetime;
        if drifted {
            after.reset_totals(total, lifetime);
            self.store.put_balance(&after)?;
            tracing::warn!(
                user_id = %user_id,
                total_points = total,
                lifetime_points = lifetime,
                "Balance drifted from ledger, rewritten"
            );
        }

        Ok(ReconcileReport {
            user_id: *user_id,
            before,
            after,
            drifted,
        })
    }
}
