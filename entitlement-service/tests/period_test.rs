//! Billing period integration tests.

mod common;

use chrono::{Duration, Utc};
use common::{new_account, TestApp};
use entitlement_service::models::ResourceType;
use entitlement_service::services::EntitlementStore;
use service_core::error::AppError;

#[tokio::test]
async fn current_period_is_lazily_opened_once() {
    let app = TestApp::spawn();
    let account_id = new_account();

    app.store.ensure_account(account_id).await.unwrap();
    let first = app.store.current_period(account_id).await.unwrap();
    let second = app.store.current_period(account_id).await.unwrap();

    assert_eq!(first.period_id, second.period_id);
    assert_eq!(
        first.period_end - first.period_start,
        Duration::days(30)
    );

    let periods = app.store.list_periods(account_id).await.unwrap();
    assert_eq!(periods.len(), 1);
}

#[tokio::test]
async fn events_keep_their_period_after_rollover() {
    let app = TestApp::spawn();
    let account_id = new_account();

    for _ in 0..5 {
        let result = app
            .meter
            .record(account_id, ResourceType::Content, 1)
            .await
            .unwrap();
        assert!(result.success);
    }
    let old_period = app.store.current_period(account_id).await.unwrap();

    // Rollover: a new period opens now, closing the old one
    let start = Utc::now();
    let new_period = app
        .store
        .open_period(account_id, start, start + Duration::days(30))
        .await
        .unwrap();
    assert_ne!(new_period.period_id, old_period.period_id);

    // Old events still aggregate under the old period
    let old_total = app
        .store
        .usage_total(account_id, ResourceType::Content, old_period.period_id)
        .await
        .unwrap();
    assert_eq!(old_total, 5);

    // The fresh period starts at zero
    let check = app
        .meter
        .check(account_id, ResourceType::Content)
        .await
        .unwrap();
    assert_eq!(check.used, 0);
    assert!(check.allowed);
}

#[tokio::test]
async fn replaying_current_bounds_is_a_noop() {
    let app = TestApp::spawn();
    let account_id = new_account();

    app.store.ensure_account(account_id).await.unwrap();
    let start = Utc::now();
    let end = start + Duration::days(30);

    let first = app.store.open_period(account_id, start, end).await.unwrap();
    let count = app.store.list_periods(account_id).await.unwrap().len();

    let second = app.store.open_period(account_id, start, end).await.unwrap();
    assert_eq!(first.period_id, second.period_id);
    assert_eq!(app.store.list_periods(account_id).await.unwrap().len(), count);
}

#[tokio::test]
async fn inverted_period_bounds_are_rejected() {
    let app = TestApp::spawn();
    let account_id = new_account();

    app.store.ensure_account(account_id).await.unwrap();
    let start = Utc::now();

    let err = app
        .store
        .open_period(account_id, start, start - Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn period_overlapping_closed_history_is_rejected() {
    let app = TestApp::spawn();
    let account_id = new_account();

    app.store.ensure_account(account_id).await.unwrap();

    // Close the bootstrap period by opening a new one now
    let rollover = Utc::now();
    app.store
        .open_period(account_id, rollover, rollover + Duration::days(30))
        .await
        .unwrap();

    // A period reaching back into the closed bootstrap window conflicts
    let err = app
        .store
        .open_period(
            account_id,
            rollover - Duration::minutes(1),
            rollover + Duration::days(30),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn amending_current_period_end_keeps_its_identity() {
    let app = TestApp::spawn();
    let account_id = new_account();

    app.store.ensure_account(account_id).await.unwrap();
    let start = Utc::now();
    let period = app
        .store
        .open_period(account_id, start, start + Duration::days(30))
        .await
        .unwrap();

    let amended = app
        .store
        .open_period(account_id, start, start + Duration::days(60))
        .await
        .unwrap();

    assert_eq!(amended.period_id, period.period_id);
    assert_eq!(amended.period_end, start + Duration::days(60));
}
