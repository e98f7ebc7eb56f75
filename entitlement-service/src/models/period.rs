//! Billing period model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Length of a period opened without processor input (Free bootstrap,
/// cancellation fallback).
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// One billing window for an account. Invariant: `period_end > period_start`;
/// an account has exactly one current period at any time. Closed periods
/// stay queryable for historical aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillingPeriod {
    pub period_id: Uuid,
    pub account_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.period_start <= at && at < self.period_end
    }
}
