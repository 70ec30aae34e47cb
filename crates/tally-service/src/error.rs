//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::VerificationLevel;
use tally_ledger::LedgerError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No active rule for the transaction type.
    #[error("no active rule for {0}")]
    RuleMissing(String),

    /// The user's verification tier is too low.
    #[error("verification level {required} required")]
    VerificationRequired {
        /// Tier the rule requires.
        required: VerificationLevel,
        /// Tier the user holds.
        actual: VerificationLevel,
    },

    /// An earning cap would be exceeded.
    #[error("{scope} limit exceeded")]
    LimitExceeded {
        /// `daily` or `event`.
        scope: &'static str,
        /// The configured cap.
        limit: i64,
        /// Points already earned in the scope.
        earned: i64,
        /// Points requested.
        requested: i64,
    },

    /// A debit would overdraw the spendable balance.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Current spendable points.
        balance: i64,
        /// Points the debit needs.
        required: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::RuleMissing(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "rule_missing",
                self.to_string(),
                None,
            ),
            Self::VerificationRequired { required, actual } => (
                StatusCode::FORBIDDEN,
                "verification_required",
                self.to_string(),
                Some(serde_json::json!({
                    "required": required,
                    "actual": actual
                })),
            ),
            Self::LimitExceeded {
                scope,
                limit,
                earned,
                requested,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                if *scope == "daily" {
                    "daily_limit_exceeded"
                } else {
                    "event_limit_exceeded"
                },
                self.to_string(),
                Some(serde_json::json!({
                    "limit": limit,
                    "earned": earned,
                    "requested": requested
                })),
            ),
            Self::InsufficientPoints { balance, required } => (
                StatusCode::CONFLICT,
                "insufficient_points",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::RuleMissing(ty) => Self::RuleMissing(ty.to_string()),
            LedgerError::VerificationRequired { required, actual } => {
                Self::VerificationRequired { required, actual }
            }
            LedgerError::DailyLimitExceeded {
                limit,
                earned,
                requested,
            } => Self::LimitExceeded {
                scope: "daily",
                limit,
                earned,
                requested,
            },
            LedgerError::EventLimitExceeded {
                limit,
                earned,
                requested,
            } => Self::LimitExceeded {
                scope: "event",
                limit,
                earned,
                requested,
            },
            LedgerError::InvalidPoints(msg) => Self::BadRequest(msg),
            LedgerError::InsufficientPoints { balance, required } => {
                Self::InsufficientPoints { balance, required }
            }
            LedgerError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            LedgerError::Persistence(e) => Self::Internal(e.to_string()),
        }
    }
}
