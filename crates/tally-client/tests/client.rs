//! Client SDK tests against a mock tally service.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tally_client::{AwardPointsRequest, ClientError, ClientOptions, TallyClient};
use tally_core::{Timeframe, TransactionStatus, TransactionType, UserId, VerificationLevel};

const API_KEY: &str = "test-service-key";

async fn client_for(server: &MockServer) -> TallyClient {
    TallyClient::with_options(
        server.uri(),
        API_KEY,
        ClientOptions::with_service_name("events-api"),
    )
    .unwrap()
}

fn transaction_json(points: i64) -> serde_json::Value {
    json!({
        "id": "01HZX3J5Q7K8M9N0P1R2S3T4V5",
        "event_id": null,
        "transaction_type": "event_create",
        "points_earned": points,
        "description": "Created an event",
        "metadata": null,
        "risk_score": 0,
        "status": "completed",
        "created_at": "2026-10-19T12:00:00Z"
    })
}

fn balance_json(user_id: &UserId, total: i64) -> serde_json::Value {
    json!({
        "user_id": user_id,
        "total_points": total,
        "lifetime_points": total,
        "current_level": 1,
        "level_progress": total,
        "points_to_next_level": 100 - total,
        "updated_at": "2026-10-19T12:00:00Z"
    })
}

fn error_json(code: &str, message: &str, details: serde_json::Value) -> serde_json::Value {
    json!({ "error": { "code": code, "message": message, "details": details } })
}

#[tokio::test]
async fn award_points_sends_service_headers() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("POST"))
        .and(path("/v1/points/award"))
        .and(header("x-api-key", API_KEY))
        .and(header("x-service-name", "events-api"))
        .and(body_partial_json(json!({
            "user_id": user_id,
            "transaction_type": "event_create",
            "dedup_key": "create-1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "transaction": transaction_json(25),
            "balance": balance_json(&user_id, 50),
            "achievements": [{
                "achievement_type": "event_creator",
                "achievement_name": "Event Creator",
                "description": "Created your first event",
                "points_earned": 25,
                "achieved_at": "2026-10-19T12:00:00Z"
            }],
            "bonus_transactions": [],
            "risk_flags": [],
            "replayed": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client
        .award_points(
            AwardPointsRequest::new(user_id, TransactionType::EventCreate, "Created an event")
                .with_dedup_key("create-1"),
        )
        .await
        .unwrap();

    assert_eq!(response.transaction.points_earned, 25);
    assert_eq!(response.transaction.status, TransactionStatus::Completed);
    assert_eq!(response.balance.unwrap().total_points, 50);
    assert_eq!(response.achievements[0].achievement_type, "event_creator");
    assert!(!response.replayed);
}

#[tokio::test]
async fn limit_errors_are_typed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/points/award"))
        .respond_with(ResponseTemplate::new(429).set_body_json(error_json(
            "daily_limit_exceeded",
            "daily limit exceeded",
            json!({ "limit": 100, "earned": 60, "requested": 60 }),
        )))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .award_points(AwardPointsRequest::new(
            UserId::generate(),
            TransactionType::EventShare,
            "Shared",
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::DailyLimitExceeded {
            limit: 100,
            earned: 60,
            requested: 60
        }
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn verification_errors_are_typed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/points/award"))
        .respond_with(ResponseTemplate::new(403).set_body_json(error_json(
            "verification_required",
            "verification level email required",
            json!({ "required": "email", "actual": "none" }),
        )))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .award_points(AwardPointsRequest::new(
            UserId::generate(),
            TransactionType::Referral,
            "Referred a friend",
        ))
        .await
        .unwrap_err();

    match err {
        ClientError::VerificationRequired { required, actual } => {
            assert_eq!(required, "email");
            assert_eq!(actual, "none");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn get_balance_not_found() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("GET"))
        .and(path(format!("/v1/users/{user_id}/balance")))
        .and(header("x-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(404).set_body_json(error_json(
            "not_found",
            "balance not found",
            serde_json::Value::Null,
        )))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_balance(&user_id).await.unwrap_err();

    assert!(matches!(err, ClientError::NotFound(message) if message == "balance not found"));
}

#[tokio::test]
async fn get_balance_success() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("GET"))
        .and(path(format!("/v1/users/{user_id}/balance")))
        .respond_with(ResponseTemplate::new(200).set_body_json(balance_json(&user_id, 30)))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let balance = client.get_balance(&user_id).await.unwrap();

    assert_eq!(balance.user_id, user_id);
    assert_eq!(balance.total_points, 30);
    assert_eq!(balance.points_to_next_level, 70);
}

#[tokio::test]
async fn get_transactions_passes_paging() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("GET"))
        .and(path(format!("/v1/users/{user_id}/transactions")))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactions": [transaction_json(25), transaction_json(25)],
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let page = client.get_transactions(&user_id, 2, 4).await.unwrap();

    assert_eq!(page.transactions.len(), 2);
    assert!(page.has_more);
}

#[tokio::test]
async fn get_achievements() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("GET"))
        .and(path(format!("/v1/users/{user_id}/achievements")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "achievements": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let achievements = client.get_achievements(&user_id).await.unwrap();

    assert!(achievements.achievements.is_empty());
}

#[tokio::test]
async fn get_leaderboard_passes_timeframe() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("GET"))
        .and(path("/v1/leaderboard"))
        .and(query_param("timeframe", "week"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timeframe": "week",
            "entries": [{ "rank": 1, "user_id": user_id, "points": 170, "level": 2 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let board = client.get_leaderboard(Timeframe::Week, 5).await.unwrap();

    assert_eq!(board.timeframe, Timeframe::Week);
    assert_eq!(board.entries[0].user_id, user_id);
    assert_eq!(board.entries[0].points, 170);
}

#[tokio::test]
async fn record_verification() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("POST"))
        .and(path("/v1/security/verification"))
        .and(body_partial_json(json!({ "verification_level": "kyc" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": user_id,
            "risk_score": 0,
            "verification_level": "kyc",
            "red_flags": [],
            "manual_review_status": "none",
            "last_assessed_score": null,
            "last_assessed_at": null,
            "updated_at": "2026-10-19T12:00:00Z"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let profile = client
        .record_verification(user_id, VerificationLevel::Kyc)
        .await
        .unwrap();

    assert_eq!(profile.verification_level, VerificationLevel::Kyc);
}

#[tokio::test]
async fn unauthorized_is_typed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_json(
            "unauthorized",
            "unauthorized",
            serde_json::Value::Null,
        )))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_achievements(&UserId::generate()).await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized));
}

#[tokio::test]
async fn server_errors_are_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_json(
            "internal_error",
            "An internal error occurred",
            serde_json::Value::Null,
        )))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_balance(&UserId::generate()).await.unwrap_err();

    assert!(matches!(&err, ClientError::Api { status: 500, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn non_json_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_balance(&UserId::generate()).await.unwrap_err();

    assert!(matches!(err, ClientError::Api { code, status: 502, .. } if code == "unknown"));
}
