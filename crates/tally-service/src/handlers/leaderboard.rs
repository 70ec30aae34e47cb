//! Leaderboard handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::{LeaderboardEntry, Timeframe};

use crate::error::ApiError;
use crate::state::AppState;

/// Leaderboard query parameters.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// `week`, `month` or `all` (default).
    #[serde(default)]
    pub timeframe: Option<String>,
    /// Number of rows (default: 10, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// Leaderboard response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    /// The ranked window.
    pub timeframe: Timeframe,
    /// Ranked rows, best first.
    pub entries: Vec<LeaderboardEntry>,
}

/// Ranked users for a timeframe.
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let timeframe = match query.timeframe.as_deref() {
        None | Some("") => Timeframe::All,
        Some(raw) => raw.parse::<Timeframe>().map_err(ApiError::BadRequest)?,
    };

    let limit = query.limit;
    let entries = state
        .blocking(move |state| Ok(state.ledger.leaderboard(timeframe, limit)?))
        .await?;

    Ok(Json(LeaderboardResponse { timeframe, entries }))
}
