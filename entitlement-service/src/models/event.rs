//! Inbound billing events and payment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Event types delivered by the payment processor feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingEventType {
    PaymentSucceeded,
    PaymentFailed,
    SubscriptionDeleted,
    SubscriptionUpdated,
    #[serde(other)]
    Unrecognized,
}

/// A billing event from the payment processor. Delivered at-least-once and
/// possibly out of causal order; `event_id` is the processor's identifier
/// and keys the idempotency ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub event_id: String,
    #[serde(rename = "type")]
    pub event_type: BillingEventType,
    #[serde(default)]
    pub customer_ref: Option<String>,
    #[serde(default)]
    pub subscription_ref: Option<String>,
    /// Processor metadata passthrough identifying the account, for events
    /// arriving before any reference has been bound.
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Payment outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Stored record of a processor payment outcome.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    pub payment_id: Uuid,
    pub account_id: Uuid,
    pub processor_ref: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a payment outcome.
#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub account_id: Uuid,
    pub processor_ref: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub description: Option<String>,
}
