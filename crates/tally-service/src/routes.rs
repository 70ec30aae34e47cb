//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, leaderboard, points, rules, security};
use crate::state::AppState;

/// Maximum concurrent award requests.
const AWARD_MAX_CONCURRENT_REQUESTS: usize = 32;

/// Maximum concurrent requests for the rest of the API.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/leaderboard` - Ranked users (`timeframe`, `limit`)
///
/// ## Points (user JWT)
/// - `GET /v1/points/balance` - Caller's balance
/// - `GET /v1/points/transactions` - Caller's history
/// - `GET /v1/points/achievements` - Caller's achievements
///
/// ## Service API key
/// - `POST /v1/points/award` - Award points for an action
/// - `GET /v1/users/:user_id/{balance,transactions,achievements}`
/// - `POST /v1/security/verification` - Record a verification signal
/// - `GET /v1/rules` - List rules
///
/// ## Admin API key
/// - `PUT /v1/rules` - Insert or replace a rule
/// - `POST /v1/admin/adjust` - Manual adjustment
/// - `GET /v1/admin/security/:user_id` - Security profile
/// - `POST /v1/admin/security` - Update security profile
/// - `POST /v1/admin/reconcile` - Rebuild a balance from the ledger
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Points
        .route(
            "/points/award",
            post(points::award_points)
                .layer(ConcurrencyLimitLayer::new(AWARD_MAX_CONCURRENT_REQUESTS)),
        )
        .route("/points/balance", get(points::get_balance))
        .route("/points/transactions", get(points::list_transactions))
        .route("/points/achievements", get(points::list_achievements))
        // Users (service auth)
        .route("/users/:user_id/balance", get(points::get_user_balance))
        .route(
            "/users/:user_id/transactions",
            get(points::list_user_transactions),
        )
        .route(
            "/users/:user_id/achievements",
            get(points::list_user_achievements),
        )
        // Leaderboard
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        // Security
        .route("/security/verification", post(security::record_verification))
        // Rules
        .route("/rules", get(rules::list_rules).put(rules::upsert_rule))
        // Admin
        .route("/admin/adjust", post(admin::adjust_points))
        .route("/admin/security/:user_id", get(admin::get_security_profile))
        .route("/admin/security", post(admin::update_security_profile))
        .route("/admin/reconcile", post(admin::reconcile))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}
