//! Billing webhook handler.
//!
//! Receives the payment processor's event feed. The signature is verified
//! against the shared secret before anything is parsed. Processing failures
//! are acknowledged with 200 so the processor's retries stay safe; the
//! adapter is idempotent.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use secrecy::ExposeSecret;
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::tracing::RequestId;
use service_core::utils::signature::verify_payload;

use crate::models::BillingEvent;
use crate::startup::AppState;

pub const SIGNATURE_HEADER: &str = "x-billing-signature";

pub async fn billing_webhook(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing {} header", SIGNATURE_HEADER);
            AppError::Unauthorized(anyhow::anyhow!("Missing webhook signature"))
        })?;

    let is_valid = verify_payload(
        state.config.webhook.signing_secret.expose_secret(),
        &body,
        signature,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Webhook signature verification error");
        AppError::InternalError(anyhow::anyhow!("Webhook verification failed"))
    })?;

    if !is_valid {
        tracing::warn!("Invalid webhook signature");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid webhook signature"
        )));
    }

    let event: BillingEvent = serde_json::from_str(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse billing event");
        AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload"))
    })?;

    tracing::info!(
        request_id = %request_id,
        event_id = %event.event_id,
        event_type = ?event.event_type,
        "Received billing event"
    );

    match state.adapter.apply(&event).await {
        Ok(disposition) => Ok((
            StatusCode::OK,
            Json(json!({
                "received": true,
                "disposition": disposition
            })),
        )),
        Err(e) => {
            tracing::error!(
                event_id = %event.event_id,
                error = %e,
                "Failed to apply billing event"
            );
            crate::services::record_error("billing_event_apply", "billing_webhook");
            Ok((StatusCode::OK, Json(json!({ "received": true }))))
        }
    }
}
