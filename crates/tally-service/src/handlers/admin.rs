//! Operator handlers: adjustments, security review and reconciliation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use tally_core::{ManualReviewStatus, SecurityProfile, UserId};
use tally_ledger::{ReconcileReport, SecurityUpdate};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::handlers::points::{award_reply, AwardResponse};
use crate::state::AppState;

/// Largest credit or debit a single adjustment may carry.
pub const MAX_ADJUSTMENT_POINTS: u64 = 1_000_000_000;

/// Manual adjustment request.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    /// The user to adjust.
    pub user_id: UserId,
    /// Points to credit (positive) or debit (negative).
    pub points: i64,
    /// Reason, stored on the ledger row.
    pub description: String,
    /// Idempotency key.
    #[serde(default)]
    pub dedup_key: Option<String>,
}

/// Credit or debit a user's points by hand.
pub async fn adjust_points(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<AdjustRequest>,
) -> Result<(StatusCode, Json<AwardResponse>), ApiError> {
    if body.description.trim().is_empty() {
        return Err(ApiError::BadRequest("description is required".into()));
    }
    if body.points.unsigned_abs() > MAX_ADJUSTMENT_POINTS {
        return Err(ApiError::BadRequest(format!(
            "points must be within ±{MAX_ADJUSTMENT_POINTS}"
        )));
    }

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %body.user_id,
        points = body.points,
        description = %body.description,
        "Admin adjusting points"
    );

    let outcome = state
        .blocking(move |state| {
            Ok(state.ledger.adjust(
                body.user_id,
                body.points,
                format!("Admin: {}", body.description),
                body.dedup_key,
            )?)
        })
        .await?;

    Ok(award_reply(&outcome))
}

/// Get a user's security profile.
pub async fn get_security_profile(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<SecurityProfile>, ApiError> {
    let profile = state
        .blocking(move |state| Ok(state.ledger.security_profile(&user_id)?))
        .await?;
    Ok(Json(profile))
}

/// Security profile update request.
#[derive(Debug, Deserialize)]
pub struct UpdateSecurityRequest {
    /// The profile to change.
    pub user_id: UserId,
    /// New baseline risk score.
    #[serde(default)]
    pub risk_score: Option<u8>,
    /// New review status.
    #[serde(default)]
    pub manual_review_status: Option<ManualReviewStatus>,
}

/// Change a user's baseline risk or review status.
pub async fn update_security_profile(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<UpdateSecurityRequest>,
) -> Result<Json<SecurityProfile>, ApiError> {
    if body.risk_score.is_some_and(|score| score > 100) {
        return Err(ApiError::BadRequest("risk_score must be between 0 and 100".into()));
    }

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %body.user_id,
        risk_score = ?body.risk_score,
        manual_review_status = ?body.manual_review_status,
        "Admin updating security profile"
    );

    let update = SecurityUpdate {
        risk_score: body.risk_score,
        manual_review_status: body.manual_review_status,
    };
    let profile = state
        .blocking(move |state| {
            Ok(state
                .ledger
                .update_security_profile(body.user_id, update)?)
        })
        .await?;

    Ok(Json(profile))
}

/// Reconcile request.
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    /// The user whose balance to rebuild.
    pub user_id: UserId,
}

/// Rebuild a user's balance from the ledger.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<ReconcileRequest>,
) -> Result<Json<ReconcileReport>, ApiError> {
    tracing::info!(admin_id = %admin.admin_id, user_id = %body.user_id, "Admin reconciling balance");

    let report = state
        .blocking(move |state| Ok(state.ledger.reconcile(&body.user_id)?))
        .await?;
    Ok(Json(report))
}
