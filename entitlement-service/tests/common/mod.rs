//! Test helper module for entitlement-service integration tests.
//!
//! Builds the real router over the in-memory store and drives it with
//! `tower::ServiceExt::oneshot`, so tests need no external infrastructure.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use entitlement_service::config::{DatabaseConfig, EntitlementConfig, WebhookConfig};
use entitlement_service::services::{
    init_metrics, BillingEventAdapter, MemoryStore, UsageMeter,
};
use entitlement_service::startup::{router, AppState};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use service_core::utils::signature::sign_payload;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

pub struct TestApp {
    pub router: axum::Router,
    pub store: Arc<MemoryStore>,
    pub meter: UsageMeter,
    pub adapter: BillingEventAdapter,
}

impl TestApp {
    pub fn spawn() -> Self {
        init_metrics();

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store.clone());
        let meter = state.meter.clone();
        let adapter = state.adapter.clone();

        TestApp {
            router: router(state),
            store,
            meter,
            adapter,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Deliver a billing event with a valid signature.
    pub async fn post_webhook(&self, event: Value) -> (StatusCode, Value) {
        let body = event.to_string();
        let signature = sign_payload(TEST_WEBHOOK_SECRET, &body).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/billing")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-billing-signature", signature)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Deliver a billing event with a bad signature.
    pub async fn post_webhook_unsigned(&self, event: Value) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/billing")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-billing-signature", "deadbeef")
            .body(Body::from(event.to_string()))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        response.status()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

pub fn test_config() -> EntitlementConfig {
    EntitlementConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "entitlement-service-test".to_string(),
        log_level: "warn".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        webhook: WebhookConfig {
            signing_secret: Secret::new(TEST_WEBHOOK_SECRET.to_string()),
        },
    }
}

pub fn new_account() -> Uuid {
    Uuid::new_v4()
}
