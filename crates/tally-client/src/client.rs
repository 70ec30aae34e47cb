//! Tally HTTP client implementation.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use tally_core::{Timeframe, UserId, VerificationLevel};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, AwardPointsRequest, AwardResponse, BalanceResponse,
    LeaderboardResponse, ListAchievementsResponse, ListTransactionsResponse,
    RecordVerificationRequest, VerificationResponse,
};

/// Tally API client for platform services.
#[derive(Debug, Clone)]
pub struct TallyClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl TallyClient {
    /// Create a new tally client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the tally service (e.g., `"http://tally:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new tally client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    /// Report a point-earning action.
    ///
    /// A new award and a replayed one (same dedup key) both succeed; check
    /// [`AwardResponse::replayed`] to tell them apart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects the award.
    pub async fn award_points(
        &self,
        request: AwardPointsRequest,
    ) -> Result<AwardResponse, ClientError> {
        let response = self
            .authed(self.client.post(self.url("/v1/points/award")))
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a user's balance.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the user has never earned points.
    pub async fn get_balance(&self, user_id: &UserId) -> Result<BalanceResponse, ClientError> {
        let url = self.url(&format!("/v1/users/{user_id}/balance"));
        let response = self.authed(self.client.get(url)).send().await?;

        self.handle_response(response).await
    }

    /// Get a page of a user's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<ListTransactionsResponse, ClientError> {
        let url = self.url(&format!("/v1/users/{user_id}/transactions"));
        let response = self
            .authed(self.client.get(url))
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a user's achievements.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_achievements(
        &self,
        user_id: &UserId,
    ) -> Result<ListAchievementsResponse, ClientError> {
        let url = self.url(&format!("/v1/users/{user_id}/achievements"));
        let response = self.authed(self.client.get(url)).send().await?;

        self.handle_response(response).await
    }

    /// Get the leaderboard for a timeframe.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_leaderboard(
        &self,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<LeaderboardResponse, ClientError> {
        let response = self
            .client
            .get(self.url("/v1/leaderboard"))
            .query(&[("timeframe", timeframe.as_str())])
            .query(&[("limit", limit)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Record a verification signal. The service never lowers a tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn record_verification(
        &self,
        user_id: UserId,
        verification_level: VerificationLevel,
    ) -> Result<VerificationResponse, ClientError> {
        let request = RecordVerificationRequest {
            user_id,
            verification_level,
        };
        let response = self
            .authed(self.client.post(self.url("/v1/security/verification")))
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let Ok(api_error) = response.json::<ApiErrorResponse>().await else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };

        let error = api_error.error;
        tracing::debug!(
            status = %status,
            code = %error.code,
            message = %error.message,
            "Tally API returned an error"
        );

        let detail = |key: &str| {
            error
                .details
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(0)
        };
        let level = |key: &str| {
            error
                .details
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(serde_json::Value::as_str)
                .unwrap_or("none")
                .to_string()
        };

        Err(match error.code.as_str() {
            "unauthorized" => ClientError::Unauthorized,
            "not_found" => ClientError::NotFound(error.message),
            "rule_missing" => ClientError::RuleMissing(error.message),
            "verification_required" => ClientError::VerificationRequired {
                required: level("required"),
                actual: level("actual"),
            },
            "daily_limit_exceeded" => ClientError::DailyLimitExceeded {
                limit: detail("limit"),
                earned: detail("earned"),
                requested: detail("requested"),
            },
            "event_limit_exceeded" => ClientError::EventLimitExceeded {
                limit: detail("limit"),
                earned: detail("earned"),
                requested: detail("requested"),
            },
            "insufficient_points" => ClientError::InsufficientPoints {
                balance: detail("balance"),
                required: detail("required"),
            },
            _ => ClientError::Api {
                code: error.code.clone(),
                message: error.message.clone(),
                status: status.as_u16(),
            },
        })
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}
