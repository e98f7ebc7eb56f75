//! Application startup and lifecycle management.

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::EntitlementConfig;
use crate::handlers;
use crate::services::{
    init_metrics, BillingEventAdapter, Database, EntitlementStore, UsageMeter,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: EntitlementConfig,
    pub store: Arc<dyn EntitlementStore>,
    pub meter: UsageMeter,
    pub adapter: BillingEventAdapter,
}

impl AppState {
    pub fn new(config: EntitlementConfig, store: Arc<dyn EntitlementStore>) -> Self {
        let meter = UsageMeter::new(store.clone());
        let adapter = BillingEventAdapter::new(store.clone());
        Self {
            config,
            store,
            meter,
            adapter,
        }
    }
}

/// Build the service router over any store.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/api/plans", get(handlers::plans::list_plans))
        .route("/api/plans/:tier", get(handlers::plans::get_plan))
        .route(
            "/api/accounts/:account_id/subscription",
            get(handlers::subscriptions::get_subscription),
        )
        .route(
            "/api/accounts/:account_id/payments",
            get(handlers::subscriptions::list_payments),
        )
        .route(
            "/api/accounts/:account_id/usage",
            get(handlers::usage::get_usage).post(handlers::usage::record_usage),
        )
        .route(
            "/api/accounts/:account_id/entitlements/:resource_type",
            get(handlers::usage::check_entitlement),
        )
        .route("/webhooks/billing", post(handlers::webhook::billing_webhook))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: EntitlementConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        let store: Arc<dyn EntitlementStore> = Arc::new(db);
        let state = AppState::new(config.clone(), store);

        let addr = config.common.addr();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Entitlement service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "entitlement-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router(self.state)).await
    }
}
