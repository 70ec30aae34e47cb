//! Verification handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use tally_core::{SecurityProfile, UserId, VerificationLevel};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Verification signal from the identity provider.
#[derive(Debug, Deserialize)]
pub struct RecordVerificationRequest {
    /// The verified user.
    pub user_id: UserId,
    /// The tier the user reached.
    pub verification_level: VerificationLevel,
}

/// Raise a user's verification tier. Lower tiers are ignored.
pub async fn record_verification(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(body): Json<RecordVerificationRequest>,
) -> Result<Json<SecurityProfile>, ApiError> {
    tracing::debug!(
        service = %service.service_name,
        user_id = %body.user_id,
        level = %body.verification_level,
        "Verification reported"
    );

    let profile = state
        .blocking(move |state| {
            Ok(state
                .ledger
                .record_verification(body.user_id, body.verification_level)?)
        })
        .await?;

    Ok(Json(profile))
}
