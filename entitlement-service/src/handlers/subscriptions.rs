//! Subscription view and payment history handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::error::MeteringError;
use crate::models::{PaymentRecord, SubscriptionStatus, Tier};
use crate::startup::AppState;

/// Tier/status/period view of an account.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub account_id: Uuid,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

/// Get the account's subscription view.
///
/// An account with no subscription record gets the Free-tier default with a
/// freshly opened billing period.
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let account = state.store.ensure_account(account_id).await?;
    let period = state.store.current_period(account_id).await?;

    Ok(Json(SubscriptionResponse {
        account_id,
        tier: Tier::from_string(&account.tier),
        status: SubscriptionStatus::from_string(&account.status),
        current_period_start: period.period_start,
        current_period_end: period.period_end,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    #[serde(default = "default_page_size")]
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

fn default_page_size() -> i32 {
    10
}

#[derive(Debug, Serialize)]
pub struct ListPaymentsResponse {
    pub payments: Vec<PaymentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<Uuid>,
}

/// List payment history for an account.
pub async fn list_payments(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<ListPaymentsResponse>, AppError> {
    if state.store.fetch_account(account_id).await?.is_none() {
        return Err(MeteringError::AccountNotFound(account_id).into());
    }

    let payments = state
        .store
        .list_payments(account_id, query.page_size, query.page_token)
        .await?;

    let next_page_token = if payments.len() == query.page_size.clamp(1, 100) as usize {
        payments.last().map(|p| p.payment_id)
    } else {
        None
    };

    Ok(Json(ListPaymentsResponse {
        payments,
        next_page_token,
    }))
}
