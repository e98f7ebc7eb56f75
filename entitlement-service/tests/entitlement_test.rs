//! Entitlement check integration tests.

mod common;

use axum::http::StatusCode;
use common::{new_account, TestApp};
use entitlement_service::models::{ResourceType, SubscriptionStatus, Tier};
use entitlement_service::services::EntitlementStore;
use serde_json::json;

#[tokio::test]
async fn unknown_account_defaults_to_free_tier_with_open_period() {
    let app = TestApp::spawn();
    let account_id = new_account();

    let (status, body) = app
        .get(&format!("/api/accounts/{}/subscription", account_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "free");
    assert_eq!(body["status"], "active");

    let periods = app.store.list_periods(account_id).await.unwrap();
    assert_eq!(periods.len(), 1);
}

#[tokio::test]
async fn check_reports_usage_and_remaining_quota() {
    let app = TestApp::spawn();
    let account_id = new_account();

    for _ in 0..3 {
        let result = app
            .meter
            .record(account_id, ResourceType::Content, 1)
            .await
            .unwrap();
        assert!(result.success);
    }

    let (status, body) = app
        .get(&format!(
            "/api/accounts/{}/entitlements/content",
            account_id
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert_eq!(body["used"], 3);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["remaining"], 7);
}

#[tokio::test]
async fn free_account_at_content_limit_is_denied() {
    let app = TestApp::spawn();
    let account_id = new_account();

    for _ in 0..10 {
        let result = app
            .meter
            .record(account_id, ResourceType::Content, 1)
            .await
            .unwrap();
        assert!(result.success);
    }

    let (_, body) = app
        .get(&format!(
            "/api/accounts/{}/entitlements/content",
            account_id
        ))
        .await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["used"], 10);
    assert_eq!(body["remaining"], 0);

    // The eleventh record is denied and persists nothing
    let (status, body) = app
        .post_json(
            &format!("/api/accounts/{}/usage", account_id),
            json!({ "resource_type": "content" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "limit_exceeded");

    let (_, overview) = app.get(&format!("/api/accounts/{}/usage", account_id)).await;
    assert_eq!(overview["usage"]["content"]["used"], 10);
}

#[tokio::test]
async fn unlimited_resource_is_always_allowed() {
    let app = TestApp::spawn();
    let account_id = new_account();

    app.store.ensure_account(account_id).await.unwrap();
    app.store
        .update_tier_status(account_id, Tier::Enterprise, SubscriptionStatus::Active)
        .await
        .unwrap();

    // Allowed at zero usage
    let (_, body) = app
        .get(&format!(
            "/api/accounts/{}/entitlements/content",
            account_id
        ))
        .await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["limit"], "unlimited");
    assert_eq!(body["remaining"], "unlimited");

    // Still allowed after a very large count
    let result = app
        .meter
        .record(account_id, ResourceType::Content, 1_000_000)
        .await
        .unwrap();
    assert!(result.success);

    let (_, body) = app
        .get(&format!(
            "/api/accounts/{}/entitlements/content",
            account_id
        ))
        .await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["used"], 1_000_000);
    assert_eq!(body["limit"], "unlimited");
}

#[tokio::test]
async fn unknown_resource_type_is_rejected() {
    let app = TestApp::spawn();
    let account_id = new_account();

    let (status, _) = app
        .get(&format!("/api/accounts/{}/entitlements/videos", account_id))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_json(
            &format!("/api/accounts/{}/usage", account_id),
            json!({ "resource_type": "videos" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn usage_overview_covers_every_resource_type() {
    let app = TestApp::spawn();
    let account_id = new_account();

    app.meter
        .record(account_id, ResourceType::SocialPost, 2)
        .await
        .unwrap();

    let (status, body) = app.get(&format!("/api/accounts/{}/usage", account_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "free");

    for resource in ["content", "social_post", "email", "affiliate_link"] {
        assert!(body["usage"][resource].is_object(), "missing {}", resource);
    }
    assert_eq!(body["usage"]["social_post"]["used"], 2);
    assert_eq!(body["usage"]["social_post"]["limit"], 50);
    assert_eq!(body["usage"]["social_post"]["remaining"], 48);
    assert_eq!(body["usage"]["content"]["used"], 0);
}
