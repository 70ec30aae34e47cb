//! Award, balance, transaction and achievement handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::{
    Achievement, Balance, EventId, RiskFlag, Transaction, TransactionStatus, TransactionType,
    UserId, POINTS_PER_LEVEL,
};
use tally_ledger::{AwardOutcome, AwardRequest};

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

/// Balance response.
#[derive(Debug, Serialize, Deserialize)]
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
    pub updated_at: String,
}

impl From<&Balance> for BalanceResponse {
    fn from(balance: &Balance) -> Self {
        Self {
            user_id: balance.user_id,
            total_points: balance.total_points,
            lifetime_points: balance.lifetime_points,
            current_level: balance.current_level,
            level_progress: balance.level_progress,
            points_to_next_level: u32::try_from(
                POINTS_PER_LEVEL - i64::from(balance.level_progress),
            )
            .unwrap_or(0),
            updated_at: balance.updated_at.to_rfc3339(),
        }
    }
}

/// Transaction response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Related event, if any.
    pub event_id: Option<EventId>,
    /// What the user did.
    pub transaction_type: TransactionType,
    /// Points credited (negative for debits).
    pub points_earned: i64,
    /// Description.
    pub description: String,
    /// Caller context.
    pub metadata: serde_json::Value,
    /// Risk score at the time of the award.
    pub risk_score: u8,
    /// Whether the row counts toward the balance.
    pub status: TransactionStatus,
    /// Timestamp.
    pub created_at: String,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            event_id: tx.event_id,
            transaction_type: tx.transaction_type,
            points_earned: tx.points_earned,
            description: tx.description.clone(),
            metadata: tx.metadata.clone(),
            risk_score: tx.risk_score,
            status: tx.status,
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// Achievement response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AchievementResponse {
    /// Achievement key.
    pub achievement_type: String,
    /// Display name.
    pub achievement_name: String,
    /// Display description.
    pub description: String,
    /// Bonus points attached.
    pub points_earned: i64,
    /// When it was unlocked.
    pub achieved_at: String,
}

impl From<&Achievement> for AchievementResponse {
    fn from(achievement: &Achievement) -> Self {
        Self {
            achievement_type: achievement.achievement_type.clone(),
            achievement_name: achievement.achievement_name.clone(),
            description: achievement.description.clone(),
            points_earned: achievement.points_earned,
            achieved_at: achievement.achieved_at.to_rfc3339(),
        }
    }
}

/// Award response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AwardResponse {
    /// The ledger row for the award.
    pub transaction: TransactionResponse,
    /// Balance after the award and its bonuses.
    pub balance: Option<BalanceResponse>,
    /// Achievements unlocked.
    pub achievements: Vec<AchievementResponse>,
    /// Bonus rows credited for those achievements.
    pub bonus_transactions: Vec<TransactionResponse>,
    /// Heuristics the award tripped.
    pub risk_flags: Vec<RiskFlag>,
    /// `true` when an earlier award with the same dedup key was returned.
    pub replayed: bool,
}

impl From<&AwardOutcome> for AwardResponse {
    fn from(outcome: &AwardOutcome) -> Self {
        Self {
            transaction: TransactionResponse::from(&outcome.transaction),
            balance: outcome.balance.as_ref().map(BalanceResponse::from),
            achievements: outcome
                .achievements
                .iter()
                .map(AchievementResponse::from)
                .collect(),
            bonus_transactions: outcome
                .bonus_transactions
                .iter()
                .map(TransactionResponse::from)
                .collect(),
            risk_flags: outcome
                .risk
                .as_ref()
                .map(|risk| risk.flags.clone())
                .unwrap_or_default(),
            replayed: outcome.replayed,
        }
    }
}

/// `201 Created` for a new award, `200 OK` for a replay.
pub(crate) fn award_reply(outcome: &AwardOutcome) -> (StatusCode, Json<AwardResponse>) {
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    (status, Json(AwardResponse::from(outcome)))
}

// ============================================================================
// Awards (service auth)
// ============================================================================

/// Award points for a user action.
pub async fn award_points(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(request): Json<AwardRequest>,
) -> Result<(StatusCode, Json<AwardResponse>), ApiError> {
    if matches!(
        request.transaction_type,
        TransactionType::AchievementBonus | TransactionType::AdminAdjustment
    ) {
        return Err(ApiError::BadRequest(format!(
            "{} cannot be awarded directly",
            request.transaction_type
        )));
    }
    if request.description.trim().is_empty() {
        return Err(ApiError::BadRequest("description is required".into()));
    }

    tracing::debug!(
        service = %service.service_name,
        user_id = %request.user_id,
        transaction_type = %request.transaction_type,
        "Award requested"
    );

    let outcome = state
        .blocking(move |state| Ok(state.ledger.award(request)?))
        .await?;

    Ok(award_reply(&outcome))
}

// ============================================================================
// Reads
// ============================================================================

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// List transactions response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List achievements response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListAchievementsResponse {
    /// Achievements (oldest first).
    pub achievements: Vec<AchievementResponse>,
}

/// Record the verification tier a user's token asserts.
fn sync_verification(state: &AppState, auth: &AuthUser) -> Result<(), ApiError> {
    if let Some(level) = auth.verification_level {
        state.ledger.record_verification(auth.user_id, level)?;
    }
    Ok(())
}

fn balance_for(state: &AppState, user_id: &UserId) -> Result<BalanceResponse, ApiError> {
    let balance = state.ledger.balance(user_id)?;
    Ok(BalanceResponse::from(&balance))
}

fn transactions_for(
    state: &AppState,
    user_id: &UserId,
    query: &ListTransactionsQuery,
) -> Result<ListTransactionsResponse, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit.clamp(1, 100);
    let transactions = state
        .ledger
        .transactions(user_id, limit + 1, query.offset)?;

    let has_more = transactions.len() > limit;
    let transactions = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(ListTransactionsResponse {
        transactions,
        has_more,
    })
}

fn achievements_for(
    state: &AppState,
    user_id: &UserId,
) -> Result<ListAchievementsResponse, ApiError> {
    let achievements = state
        .ledger
        .achievements(user_id)?
        .iter()
        .map(AchievementResponse::from)
        .collect();
    Ok(ListAchievementsResponse { achievements })
}

/// Get the caller's balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state
        .blocking(move |state| {
            sync_verification(state, &auth)?;
            balance_for(state, &auth.user_id)
        })
        .await?;
    Ok(Json(balance))
}

/// List the caller's transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    let page = state
        .blocking(move |state| {
            sync_verification(state, &auth)?;
            transactions_for(state, &auth.user_id, &query)
        })
        .await?;
    Ok(Json(page))
}

/// List the caller's achievements.
pub async fn list_achievements(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListAchievementsResponse>, ApiError> {
    let achievements = state
        .blocking(move |state| {
            sync_verification(state, &auth)?;
            achievements_for(state, &auth.user_id)
        })
        .await?;
    Ok(Json(achievements))
}

/// Get any user's balance.
pub async fn get_user_balance(
    State(state): State<Arc<AppState>>,
    _service: ServiceAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state
        .blocking(move |state| balance_for(state, &user_id))
        .await?;
    Ok(Json(balance))
}

/// List any user's transaction history.
pub async fn list_user_transactions(
    State(state): State<Arc<AppState>>,
    _service: ServiceAuth,
    Path(user_id): Path<UserId>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    let page = state
        .blocking(move |state| transactions_for(state, &user_id, &query))
        .await?;
    Ok(Json(page))
}

/// List any user's achievements.
pub async fn list_user_achievements(
    State(state): State<Arc<AppState>>,
    _service: ServiceAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<ListAchievementsResponse>, ApiError> {
    let achievements = state
        .blocking(move |state| achievements_for(state, &user_id))
        .await?;
    Ok(Json(achievements))
}
