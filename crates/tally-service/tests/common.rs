//! Common test utilities for tally-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::{TestResponse, TestServer};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use tally_core::{RuleBook, UserId, VerificationLevel};
use tally_ledger::LedgerConfig;
use tally_service::auth::JwtClaims;
use tally_service::{create_router, AppState, ServiceConfig};
use tally_store::MemoryStore;

pub const SERVICE_API_KEY: &str = "test-service-key";
pub const ADMIN_API_KEY: &str = "test-admin-key";
pub const JWT_SECRET: &str = "test-jwt-secret";
pub const ISSUER: &str = "tally-auth";
pub const AUDIENCE: &str = "tally";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// A fresh in-memory ledger with the standard rules.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RuleBook::standard()),
            config,
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            test_user_id: UserId::generate(),
        }
    }

    /// Bearer header for the test user.
    pub fn user_auth_header(&self) -> String {
        bearer(&self.test_user_id, None)
    }

    /// Award points as a platform service.
    pub async fn award(&self, body: serde_json::Value) -> TestResponse {
        self.server
            .post("/v1/points/award")
            .add_header("x-api-key", SERVICE_API_KEY)
            .json(&body)
            .await
    }

    /// Award an `event_create` to `user_id` at the given tier.
    pub async fn award_create(&self, user_id: &UserId, level: &str) -> TestResponse {
        self.award(json!({
            "user_id": user_id,
            "transaction_type": "event_create",
            "description": "Created an event",
            "verification_level": level
        }))
        .await
    }

    /// Credit or debit as an operator.
    pub async fn adjust(&self, user_id: &UserId, points: i64) -> TestResponse {
        self.server
            .post("/v1/admin/adjust")
            .add_header("x-admin-key", ADMIN_API_KEY)
            .json(&json!({
                "user_id": user_id,
                "points": points,
                "description": "Manual correction"
            }))
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        data_dir: "/tmp/tally-test".into(),
        auth_issuer: ISSUER.into(),
        auth_audience: AUDIENCE.into(),
        auth_jwt_secret: Some(JWT_SECRET.into()),
        service_api_key: Some(SERVICE_API_KEY.into()),
        admin_api_key: Some(ADMIN_API_KEY.into()),
        cors_origins: vec!["*".into()],
        max_body_bytes: 1024 * 1024,
        request_timeout_seconds: 30,
        rules_file: None,
        ledger: LedgerConfig::default(),
    }
}

/// Mint a token the way the identity provider would.
pub fn token(claims: &JwtClaims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to encode token")
}

pub fn claims(user_id: &UserId, level: Option<VerificationLevel>) -> JwtClaims {
    let now = chrono::Utc::now().timestamp();
    JwtClaims {
        sub: user_id.to_string(),
        aud: Some(json!(AUDIENCE)),
        iss: ISSUER.into(),
        exp: now + 3600,
        iat: now,
        verification_level: level,
    }
}

/// Bearer header carrying a valid token for `user_id`.
pub fn bearer(user_id: &UserId, level: Option<VerificationLevel>) -> String {
    format!("Bearer {}", token(&claims(user_id, level), JWT_SECRET))
}
