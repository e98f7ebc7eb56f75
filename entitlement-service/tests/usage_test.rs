//! Usage recording integration tests.

mod common;

use axum::http::StatusCode;
use common::{new_account, TestApp};
use entitlement_service::models::ResourceType;
use futures::future::join_all;
use serde_json::json;

#[tokio::test]
async fn record_usage_appends_event() {
    let app = TestApp::spawn();
    let account_id = new_account();

    let (status, body) = app
        .post_json(
            &format!("/api/accounts/{}/usage", account_id),
            json!({ "resource_type": "content" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("reason").is_none());

    let (_, overview) = app.get(&format!("/api/accounts/{}/usage", account_id)).await;
    assert_eq!(overview["usage"]["content"]["used"], 1);
}

#[tokio::test]
async fn record_usage_honors_quantity() {
    let app = TestApp::spawn();
    let account_id = new_account();

    let (_, body) = app
        .post_json(
            &format!("/api/accounts/{}/usage", account_id),
            json!({ "resource_type": "email", "quantity": 5 }),
        )
        .await;
    assert_eq!(body["success"], true);

    let (_, overview) = app.get(&format!("/api/accounts/{}/usage", account_id)).await;
    assert_eq!(overview["usage"]["email"]["used"], 5);
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let app = TestApp::spawn();
    let account_id = new_account();

    let (status, _) = app
        .post_json(
            &format!("/api/accounts/{}/usage", account_id),
            json!({ "resource_type": "content", "quantity": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn denied_record_persists_nothing() {
    let app = TestApp::spawn();
    let account_id = new_account();

    let result = app
        .meter
        .record(account_id, ResourceType::AffiliateLink, 20)
        .await
        .unwrap();
    assert!(result.success);

    // 20 + 10 would exceed the Free cap of 25
    let result = app
        .meter
        .record(account_id, ResourceType::AffiliateLink, 10)
        .await
        .unwrap();
    assert!(!result.success);

    let (_, overview) = app.get(&format!("/api/accounts/{}/usage", account_id)).await;
    assert_eq!(overview["usage"]["affiliate_link"]["used"], 20);
    assert_eq!(overview["usage"]["affiliate_link"]["remaining"], 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_never_overshoot_the_limit() {
    let app = TestApp::spawn();
    let account_id = new_account();

    // Free tier allows 10 content units; 25 concurrent writers race for them
    let tasks: Vec<_> = (0..25)
        .map(|_| {
            let meter = app.meter.clone();
            tokio::spawn(async move {
                meter
                    .record(account_id, ResourceType::Content, 1)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let results = join_all(tasks).await;
    let successes = results
        .iter()
        .filter(|r| r.as_ref().unwrap().success)
        .count();

    assert_eq!(successes, 10);
    assert_eq!(results.len() - successes, 15);

    let check = app
        .meter
        .check(account_id, ResourceType::Content)
        .await
        .unwrap();
    assert_eq!(check.used, 10);
    assert!(!check.allowed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_with_one_slot_left() {
    let app = TestApp::spawn();
    let account_id = new_account();

    let result = app
        .meter
        .record(account_id, ResourceType::SocialPost, 49)
        .await
        .unwrap();
    assert!(result.success);

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let meter = app.meter.clone();
            tokio::spawn(async move {
                meter
                    .record(account_id, ResourceType::SocialPost, 1)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let results = join_all(tasks).await;
    let successes = results
        .iter()
        .filter(|r| r.as_ref().unwrap().success)
        .count();

    assert_eq!(successes, 1);

    let check = app
        .meter
        .check(account_id, ResourceType::SocialPost)
        .await
        .unwrap();
    assert_eq!(check.used, 50);
}
