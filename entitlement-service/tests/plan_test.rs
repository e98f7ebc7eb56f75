//! Plan catalog integration tests.

mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn list_plans_returns_catalog_in_ascending_price_order() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/api/plans").await;
    assert_eq!(status, StatusCode::OK);

    let plans = body["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 4);

    let prices: Vec<i64> = plans
        .iter()
        .map(|p| p["monthly_price_cents"].as_i64().unwrap())
        .collect();
    let mut sorted = prices.clone();
    sorted.sort();
    assert_eq!(prices, sorted);

    assert_eq!(plans[0]["tier"], "free");
    assert_eq!(plans[1]["tier"], "starter");
    assert_eq!(plans[2]["tier"], "professional");
    assert_eq!(plans[3]["tier"], "enterprise");
}

#[tokio::test]
async fn free_plan_lists_published_limits() {
    let app = TestApp::spawn();

    let (_, body) = app.get("/api/plans").await;
    let free = &body["plans"][0];

    assert_eq!(free["monthly_price_cents"], 0);
    assert_eq!(free["limits"]["content"], 10);
    assert_eq!(free["limits"]["social_post"], 50);
    assert_eq!(free["limits"]["email"], 100);
    assert_eq!(free["limits"]["affiliate_link"], 25);
}

#[tokio::test]
async fn enterprise_limits_serialize_as_unlimited() {
    let app = TestApp::spawn();

    let (_, body) = app.get("/api/plans").await;
    let enterprise = &body["plans"][3];

    for resource in ["content", "social_post", "email", "affiliate_link"] {
        assert_eq!(enterprise["limits"][resource], "unlimited");
    }
}

#[tokio::test]
async fn get_plan_by_tier_works() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/api/plans/starter").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Starter");
    assert_eq!(body["monthly_price_cents"], 2900);
    assert_eq!(body["limits"]["content"], 100);
}

#[tokio::test]
async fn unknown_tier_is_rejected() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/api/plans/platinum").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("unknown tier"));
}

#[tokio::test]
async fn starter_is_marked_popular() {
    let app = TestApp::spawn();

    let (_, body) = app.get("/api/plans").await;
    let plans = body["plans"].as_array().unwrap();

    let popular: Vec<&str> = plans
        .iter()
        .filter(|p| p["popular"].as_bool().unwrap())
        .map(|p| p["tier"].as_str().unwrap())
        .collect();
    assert_eq!(popular, vec!["starter"]);

    // Yearly pricing gives two months free on paid tiers
    let starter = &plans[1];
    assert_eq!(
        starter["yearly_price_cents"].as_i64().unwrap(),
        starter["monthly_price_cents"].as_i64().unwrap() * 10
    );
}
