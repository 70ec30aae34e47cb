//! Client error types.

/// Errors that can occur when using the tally client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response not covered below.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The API key or token was rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// The user or profile does not exist yet.
    #[error("not found: {0}")]
    NotFound(String),

    /// No active rule is configured for the transaction type.
    #[error("rule missing: {0}")]
    RuleMissing(String),

    /// The user's verification tier is too low.
    #[error("verification required: required={required}, actual={actual}")]
    VerificationRequired {
        /// Tier the rule requires.
        required: String,
        /// Tier the user holds.
        actual: String,
    },

    /// The daily earning cap would be exceeded.
    #[error("daily limit exceeded: limit={limit}, earned={earned}, requested={requested}")]
    DailyLimitExceeded {
        /// The configured cap.
        limit: i64,
        /// Points already earned today.
        earned: i64,
        /// Points requested.
        requested: i64,
    },

    /// The per-event earning cap would be exceeded.
    #[error("event limit exceeded: limit={limit}, earned={earned}, requested={requested}")]
    EventLimitExceeded {
        /// The configured cap.
        limit: i64,
        /// Points already earned for the event.
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

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether retrying the same request (with the same dedup key) may
    /// succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
