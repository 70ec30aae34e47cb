//! Award, balance and history integration tests.

mod common;

use axum::http::StatusCode;
use common::{bearer, TestHarness, ADMIN_API_KEY, SERVICE_API_KEY};
use serde_json::json;

use tally_core::{EventId, UserId, VerificationLevel};

// ============================================================================
// Awards
// ============================================================================

#[tokio::test]
async fn award_requires_service_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/points/award")
        .json(&json!({
            "user_id": harness.test_user_id,
            "transaction_type": "event_share",
            "description": "Shared"
        }))
        .await;

    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn award_rejects_wrong_service_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/points/award")
        .add_header("x-api-key", "not-the-key")
        .json(&json!({
            "user_id": harness.test_user_id,
            "transaction_type": "event_share",
            "description": "Shared"
        }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn first_event_unlocks_creator_bonus() {
    let harness = TestHarness::new();

    let response = harness.award_create(&harness.test_user_id, "none").await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["transaction"]["points_earned"], 25);
    assert_eq!(body["transaction"]["status"], "completed");
    assert_eq!(body["achievements"][0]["achievement_type"], "event_creator");
    assert_eq!(body["bonus_transactions"][0]["transaction_type"], "achievement_bonus");
    assert_eq!(body["balance"]["total_points"], 50);
    assert_eq!(body["replayed"], false);
}

#[tokio::test]
async fn kyc_award_reaches_level_two() {
    let harness = TestHarness::new();

    let response = harness.award_create(&harness.test_user_id, "kyc").await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["transaction"]["points_earned"], 75);
    // 75 + 25 creator bonus + 20 level 2 bonus.
    assert_eq!(body["balance"]["total_points"], 120);
    assert_eq!(body["balance"]["current_level"], 2);
    assert_eq!(body["balance"]["level_progress"], 20);
    assert_eq!(body["balance"]["points_to_next_level"], 80);
    assert_eq!(body["achievements"][1]["achievement_type"], "level_2_achiever");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_awards_for_one_user_all_land() {
    let harness = TestHarness::new();
    let user_id = UserId::generate();
    let share = || {
        json!({
            "user_id": user_id,
            "transaction_type": "event_share",
            "description": "Shared",
            "verification_level": "email"
        })
    };

    let (a, b, c) = tokio::join!(
        harness.award(share()),
        harness.award(share()),
        harness.award(share())
    );
    for response in [a, b, c] {
        response.assert_status(StatusCode::CREATED);
    }

    let balance = harness
        .server
        .get(&format!("/v1/users/{user_id}/balance"))
        .add_header("x-api-key", SERVICE_API_KEY)
        .await;
    balance.assert_status_ok();
    let balance: serde_json::Value = balance.json();
    assert_eq!(balance["total_points"], 15);
    assert_eq!(balance["lifetime_points"], 15);
}

#[tokio::test]
async fn dedup_key_replays_original_award() {
    let harness = TestHarness::new();
    let request = json!({
        "user_id": harness.test_user_id,
        "transaction_type": "event_share",
        "description": "Shared",
        "verification_level": "email",
        "dedup_key": "share-1"
    });

    let first = harness.award(request.clone()).await;
    first.assert_status(StatusCode::CREATED);
    let first: serde_json::Value = first.json();

    let second = harness.award(request).await;
    second.assert_status_ok();
    let second: serde_json::Value = second.json();

    assert_eq!(second["replayed"], true);
    assert_eq!(second["transaction"]["id"], first["transaction"]["id"]);
    assert_eq!(second["balance"]["total_points"], 5);
}

#[tokio::test]
async fn reserved_types_cannot_be_awarded_directly() {
    let harness = TestHarness::new();

    for ty in ["achievement_bonus", "admin_adjustment"] {
        let response = harness
            .award(json!({
                "user_id": harness.test_user_id,
                "transaction_type": ty,
                "points": 500,
                "description": "Free points"
            }))
            .await;

        response.assert_status_bad_request();
    }
}

#[tokio::test]
async fn non_positive_points_are_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .award(json!({
            "user_id": harness.test_user_id,
            "transaction_type": "event_share",
            "points": 0,
            "description": "Shared"
        }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn referral_requires_verified_email() {
    let harness = TestHarness::new();

    let response = harness
        .award(json!({
            "user_id": harness.test_user_id,
            "transaction_type": "referral",
            "description": "Referred a friend"
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "verification_required");
    assert_eq!(body["error"]["details"]["required"], "email");
    assert_eq!(body["error"]["details"]["actual"], "none");
}

#[tokio::test]
async fn event_cap_returns_too_many_requests() {
    let harness = TestHarness::new();
    let event_id = EventId::generate();
    let checkin = json!({
        "user_id": harness.test_user_id,
        "event_id": event_id,
        "transaction_type": "event_checkin",
        "description": "Checked in",
        "verification_level": "email"
    });

    harness
        .award(checkin.clone())
        .await
        .assert_status(StatusCode::CREATED);
    harness
        .award(checkin.clone())
        .await
        .assert_status(StatusCode::CREATED);

    let response = harness.award(checkin).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "event_limit_exceeded");
    assert_eq!(body["error"]["details"]["limit"], 40);
    assert_eq!(body["error"]["details"]["earned"], 40);
}

#[tokio::test]
async fn unknown_transaction_type_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .award(json!({
            "user_id": harness.test_user_id,
            "transaction_type": "event_like",
            "description": "Liked"
        }))
        .await;

    assert!(response.status_code().is_client_error());
}

// ============================================================================
// Self-service reads (user JWT)
// ============================================================================

#[tokio::test]
async fn get_balance_success() {
    let harness = TestHarness::new();
    harness
        .award_create(&harness.test_user_id, "email")
        .await
        .assert_status(StatusCode::CREATED);

    let response = harness
        .server
        .get("/v1/points/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], harness.test_user_id.to_string());
    assert_eq!(body["total_points"], 75);
    assert_eq!(body["lifetime_points"], 75);
    assert_eq!(body["current_level"], 1);
}

#[tokio::test]
async fn get_balance_without_points_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/points/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn get_balance_without_auth_fails() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/points/balance").await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn list_transactions_paginates() {
    let harness = TestHarness::new();
    for n in 0..3 {
        harness
            .award(json!({
                "user_id": harness.test_user_id,
                "event_id": EventId::generate(),
                "transaction_type": "event_share",
                "description": format!("Share {n}"),
                "verification_level": "email"
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = harness
        .server
        .get("/v1/points/transactions?limit=2")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
    assert_eq!(body["transactions"][0]["description"], "Share 2");
    assert_eq!(body["has_more"], true);

    let response = harness
        .server
        .get("/v1/points/transactions?limit=2&offset=2")
        .add_header("authorization", harness.user_auth_header())
        .await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn list_transactions_empty() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/points/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["transactions"].as_array().unwrap().is_empty());
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn list_achievements_for_self() {
    let harness = TestHarness::new();
    harness
        .award_create(&harness.test_user_id, "none")
        .await
        .assert_status(StatusCode::CREATED);

    let response = harness
        .server
        .get("/v1/points/achievements")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let achievements = body["achievements"].as_array().unwrap();
    assert_eq!(achievements.len(), 1);
    assert_eq!(achievements[0]["achievement_name"], "Event Creator");
}

#[tokio::test]
async fn token_verification_claim_is_recorded() {
    let harness = TestHarness::new();
    let user_id = UserId::generate();

    harness
        .server
        .get("/v1/points/achievements")
        .add_header("authorization", bearer(&user_id, Some(VerificationLevel::Phone)))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get(&format!("/v1/admin/security/{user_id}"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["verification_level"], "phone");
}

// ============================================================================
// Service reads
// ============================================================================

#[tokio::test]
async fn service_can_read_any_user() {
    let harness = TestHarness::new();
    let user_id = UserId::generate();
    harness
        .award_create(&user_id, "none")
        .await
        .assert_status(StatusCode::CREATED);

    let balance = harness
        .server
        .get(&format!("/v1/users/{user_id}/balance"))
        .add_header("x-api-key", SERVICE_API_KEY)
        .await;
    balance.assert_status_ok();
    let balance: serde_json::Value = balance.json();
    assert_eq!(balance["total_points"], 50);

    let transactions = harness
        .server
        .get(&format!("/v1/users/{user_id}/transactions"))
        .add_header("x-api-key", SERVICE_API_KEY)
        .await;
    transactions.assert_status_ok();
    let transactions: serde_json::Value = transactions.json();
    assert_eq!(transactions["transactions"].as_array().unwrap().len(), 2);

    let achievements = harness
        .server
        .get(&format!("/v1/users/{user_id}/achievements"))
        .add_header("x-api-key", SERVICE_API_KEY)
        .await;
    achievements.assert_status_ok();
}

#[tokio::test]
async fn user_routes_require_service_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/v1/users/{}/balance", harness.test_user_id))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn record_verification_never_lowers() {
    let harness = TestHarness::new();
    let user_id = UserId::generate();

    for level in ["kyc", "email"] {
        let response = harness
            .server
            .post("/v1/security/verification")
            .add_header("x-api-key", SERVICE_API_KEY)
            .json(&json!({ "user_id": user_id, "verification_level": level }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["verification_level"], "kyc");
    }
}
