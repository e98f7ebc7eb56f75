//! External billing event adapter.
//!
//! Applies processor webhook events to account tier, status and billing
//! period state, strictly decoupled from the request path. Deliveries are
//! at-least-once and possibly out of causal order; an idempotency ledger
//! keyed by the processor's event id keeps replays from double-applying.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use service_core::error::AppError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    Account, BillingEvent, BillingEventType, NewPaymentRecord, PaymentStatus, SubscriptionStatus,
    Tier, DEFAULT_PERIOD_DAYS,
};
use crate::services::metrics::record_billing_event;
use crate::services::store::EntitlementStore;

/// How an inbound event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDisposition {
    Applied,
    Duplicate,
    Dropped,
    Ignored,
}

impl EventDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventDisposition::Applied => "applied",
            EventDisposition::Duplicate => "duplicate",
            EventDisposition::Dropped => "dropped",
            EventDisposition::Ignored => "ignored",
        }
    }
}

impl BillingEventType {
    fn as_str(&self) -> &'static str {
        match self {
            BillingEventType::PaymentSucceeded => "payment_succeeded",
            BillingEventType::PaymentFailed => "payment_failed",
            BillingEventType::SubscriptionDeleted => "subscription_deleted",
            BillingEventType::SubscriptionUpdated => "subscription_updated",
            BillingEventType::Unrecognized => "unrecognized",
        }
    }
}

#[derive(Clone)]
pub struct BillingEventAdapter {
    store: Arc<dyn EntitlementStore>,
}

impl BillingEventAdapter {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    /// Apply one processor event. Safe to invoke more than once with the
    /// same payload; the final state converges.
    pub async fn apply(&self, event: &BillingEvent) -> Result<EventDisposition, AppError> {
        let disposition = self.apply_inner(event).await?;
        record_billing_event(event.event_type.as_str(), disposition.as_str());
        Ok(disposition)
    }

    async fn apply_inner(&self, event: &BillingEvent) -> Result<EventDisposition, AppError> {
        if event.event_type == BillingEventType::Unrecognized {
            info!(event_id = %event.event_id, "Ignoring unrecognized billing event type");
            return Ok(EventDisposition::Ignored);
        }

        if self.store.is_event_processed(&event.event_id).await? {
            info!(event_id = %event.event_id, "Skipping already-processed billing event");
            return Ok(EventDisposition::Duplicate);
        }

        let Some(account) = self.resolve_account(event).await? else {
            warn!(
                event_id = %event.event_id,
                customer_ref = event.customer_ref.as_deref().unwrap_or("-"),
                subscription_ref = event.subscription_ref.as_deref().unwrap_or("-"),
                "Dropping billing event for unresolvable account"
            );
            return Ok(EventDisposition::Dropped);
        };

        let disposition = match event.event_type {
            BillingEventType::PaymentSucceeded => {
                self.on_payment_succeeded(&account, event).await?
            }
            BillingEventType::PaymentFailed => self.on_payment_failed(&account, event).await?,
            BillingEventType::SubscriptionDeleted => {
                self.on_subscription_deleted(&account, event).await?
            }
            BillingEventType::SubscriptionUpdated => {
                self.on_subscription_updated(&account, event).await?
            }
            BillingEventType::Unrecognized => EventDisposition::Ignored,
        };

        if disposition == EventDisposition::Applied {
            self.store.mark_event_processed(&event.event_id).await?;
        }

        Ok(disposition)
    }

    /// Resolve the target account: by subscription/customer reference first,
    /// falling back to the account id the processor carries as metadata.
    /// Metadata resolution binds the references for later events, which also
    /// covers an `updated` arriving before its corresponding `created`.
    async fn resolve_account(&self, event: &BillingEvent) -> Result<Option<Account>, AppError> {
        if let Some(account) = self
            .store
            .find_account_by_refs(event.customer_ref.as_deref(), event.subscription_ref.as_deref())
            .await?
        {
            return Ok(Some(account));
        }

        if let Some(account_id) = event.account_id {
            let account = self.store.ensure_account(account_id).await?;
            self.store
                .bind_processor_refs(
                    account_id,
                    event.customer_ref.as_deref(),
                    event.subscription_ref.as_deref(),
                )
                .await?;
            return Ok(Some(account));
        }

        Ok(None)
    }

    /// Renewal: status back to active, counters reset by opening the
    /// invoice's period. Tier is unchanged.
    async fn on_payment_succeeded(
        &self,
        account: &Account,
        event: &BillingEvent,
    ) -> Result<EventDisposition, AppError> {
        let tier = Tier::from_string(&account.tier);

        self.store
            .update_tier_status(account.account_id, tier, SubscriptionStatus::Active)
            .await?;

        match (event.period_start, event.period_end) {
            (Some(start), Some(end)) => {
                self.store.open_period(account.account_id, start, end).await?;
            }
            _ => {
                warn!(
                    event_id = %event.event_id,
                    account_id = %account.account_id,
                    "Payment succeeded event without period bounds, keeping current period"
                );
            }
        }

        self.record_payment(account.account_id, event, PaymentStatus::Succeeded, tier)
            .await?;

        info!(
            account_id = %account.account_id,
            event_id = %event.event_id,
            "Applied payment_succeeded"
        );
        Ok(EventDisposition::Applied)
    }

    /// Failed renewal: grace period policy. Status only; no period change,
    /// no automatic downgrade.
    async fn on_payment_failed(
        &self,
        account: &Account,
        event: &BillingEvent,
    ) -> Result<EventDisposition, AppError> {
        let tier = Tier::from_string(&account.tier);

        self.store
            .update_tier_status(account.account_id, tier, SubscriptionStatus::PastDue)
            .await?;

        self.record_payment(account.account_id, event, PaymentStatus::Failed, tier)
            .await?;

        info!(
            account_id = %account.account_id,
            event_id = %event.event_id,
            "Applied payment_failed"
        );
        Ok(EventDisposition::Applied)
    }

    /// Cancellation: downgrade to Free immediately and open a fresh
    /// default-length Free period.
    async fn on_subscription_deleted(
        &self,
        account: &Account,
        event: &BillingEvent,
    ) -> Result<EventDisposition, AppError> {
        self.store
            .update_tier_status(account.account_id, Tier::Free, SubscriptionStatus::Canceled)
            .await?;
        self.store.clear_subscription_ref(account.account_id).await?;

        let now = Utc::now();
        self.store
            .open_period(account.account_id, now, now + Duration::days(DEFAULT_PERIOD_DAYS))
            .await?;

        info!(
            account_id = %account.account_id,
            event_id = %event.event_id,
            "Applied subscription_deleted, downgraded to free"
        );
        Ok(EventDisposition::Applied)
    }

    /// The processor's view of tier, status and period is authoritative.
    async fn on_subscription_updated(
        &self,
        account: &Account,
        event: &BillingEvent,
    ) -> Result<EventDisposition, AppError> {
        let tier = match &event.tier {
            Some(raw) => match Tier::parse(raw) {
                Ok(tier) => tier,
                Err(e) => {
                    warn!(
                        event_id = %event.event_id,
                        account_id = %account.account_id,
                        error = %e,
                        "Dropping subscription_updated with unknown tier"
                    );
                    return Ok(EventDisposition::Dropped);
                }
            },
            None => Tier::from_string(&account.tier),
        };

        let status = match event.status.as_deref() {
            Some(raw) => match SubscriptionStatus::parse(raw) {
                Some(status) => status,
                None => {
                    warn!(
                        event_id = %event.event_id,
                        account_id = %account.account_id,
                        status = raw,
                        "Unknown status in subscription_updated, keeping current"
                    );
                    SubscriptionStatus::from_string(&account.status)
                }
            },
            None => SubscriptionStatus::from_string(&account.status),
        };

        self.store
            .update_tier_status(account.account_id, tier, status)
            .await?;

        if let (Some(start), Some(end)) = (event.period_start, event.period_end) {
            self.store.open_period(account.account_id, start, end).await?;
        }

        info!(
            account_id = %account.account_id,
            event_id = %event.event_id,
            tier = tier.as_str(),
            status = status.as_str(),
            "Applied subscription_updated"
        );
        Ok(EventDisposition::Applied)
    }

    async fn record_payment(
        &self,
        account_id: Uuid,
        event: &BillingEvent,
        status: PaymentStatus,
        tier: Tier,
    ) -> Result<(), AppError> {
        let record = NewPaymentRecord {
            account_id,
            processor_ref: event.event_id.clone(),
            amount_cents: event.amount_cents.unwrap_or(0),
            currency: event
                .currency
                .clone()
                .unwrap_or_else(|| "USD".to_string()),
            status,
            description: Some(format!("Subscription payment for {}", tier.as_str())),
        };
        self.store.insert_payment(&record).await
    }
}
