//! Storage seam for the metering core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Account, BillingPeriod, NewPaymentRecord, PaymentRecord, ResourceType, SubscriptionStatus,
    Tier, UsageEvent,
};

/// Outcome of an atomic check-and-record attempt.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Recorded(UsageEvent),
    LimitExceeded { used: i64, limit: i64 },
}

/// Persistent state behind the metering core.
///
/// `record_usage` is the authoritative gate: implementations evaluate the
/// current-period total and append the event as one atomic unit, so two
/// concurrent callers can never both pass a stale check and jointly overshoot
/// the limit. The Postgres implementation serializes same-account writers
/// with a row lock (an in-process lock would not survive multiple service
/// instances); the in-memory implementation holds its mutex across the whole
/// operation.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    /// Fetch an account if it exists.
    async fn fetch_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError>;

    /// Fetch an account, creating the Free-tier default with an open
    /// default-length period on first sight. Idempotent; concurrent
    /// first-time callers converge on a single row and period.
    async fn ensure_account(&self, account_id: Uuid) -> Result<Account, AppError>;

    /// Resolve an account from processor references, preferring the
    /// subscription reference.
    async fn find_account_by_refs(
        &self,
        customer_ref: Option<&str>,
        subscription_ref: Option<&str>,
    ) -> Result<Option<Account>, AppError>;

    /// Attach processor references to an account, keeping any already bound.
    async fn bind_processor_refs(
        &self,
        account_id: Uuid,
        customer_ref: Option<&str>,
        subscription_ref: Option<&str>,
    ) -> Result<(), AppError>;

    /// Overwrite tier and subscription status.
    async fn update_tier_status(
        &self,
        account_id: Uuid,
        tier: Tier,
        status: SubscriptionStatus,
    ) -> Result<(), AppError>;

    /// Detach the processor subscription reference (cancellation).
    async fn clear_subscription_ref(&self, account_id: Uuid) -> Result<(), AppError>;

    /// The period containing now, lazily opening a default one when the
    /// account has none (or its latest period has lapsed).
    async fn current_period(&self, account_id: Uuid) -> Result<BillingPeriod, AppError>;

    /// Open a new period, closing the current one at `start`. Opening a
    /// period never re-attributes past usage events; replaying the current
    /// bounds is a no-op. Overlap that cannot be resolved by closing the
    /// current period is a conflict.
    async fn open_period(
        &self,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BillingPeriod, AppError>;

    /// Period history for an account, oldest first.
    async fn list_periods(&self, account_id: Uuid) -> Result<Vec<BillingPeriod>, AppError>;

    /// Sum of event quantities for one account/resource/period.
    async fn usage_total(
        &self,
        account_id: Uuid,
        resource: ResourceType,
        period_id: Uuid,
    ) -> Result<i64, AppError>;

    /// Atomic check-and-record against the account's current period.
    async fn record_usage(
        &self,
        account_id: Uuid,
        resource: ResourceType,
        quantity: i32,
    ) -> Result<RecordOutcome, AppError>;

    /// Whether a processor event id has already been applied.
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, AppError>;

    /// Record a processor event id as applied.
    async fn mark_event_processed(&self, event_id: &str) -> Result<(), AppError>;

    /// Record a payment outcome; keyed by processor reference, so replays
    /// are absorbed.
    async fn insert_payment(&self, input: &NewPaymentRecord) -> Result<(), AppError>;

    /// Payment history for an account.
    async fn list_payments(
        &self,
        account_id: Uuid,
        page_size: i32,
        page_token: Option<Uuid>,
    ) -> Result<Vec<PaymentRecord>, AppError>;
}
