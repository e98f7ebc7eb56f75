//! In-memory store used by the integration tests and local development.
//!
//! Holds its mutex across each whole operation, which gives `record_usage`
//! the same atomic check-and-record contract the Postgres implementation
//! provides with row locks.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use service_core::error::AppError;
use uuid::Uuid;

use crate::error::MeteringError;
use crate::models::{
    Account, BillingPeriod, NewPaymentRecord, PaymentRecord, ResourceType, SubscriptionStatus,
    Tier, UsageEvent, DEFAULT_PERIOD_DAYS,
};
use crate::services::catalog;
use crate::services::store::{EntitlementStore, RecordOutcome};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    periods: Vec<BillingPeriod>,
    events: Vec<UsageEvent>,
    processed_events: HashSet<String>,
    payments: Vec<PaymentRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_account_locked(state: &mut MemoryState, account_id: Uuid) -> Account {
        let now = Utc::now();
        let account = state
            .accounts
            .entry(account_id)
            .or_insert_with(|| Account {
                account_id,
                tier: Tier::Free.as_str().to_string(),
                status: SubscriptionStatus::Active.as_str().to_string(),
                processor_customer_ref: None,
                processor_subscription_ref: None,
                created_utc: now,
                updated_utc: now,
            })
            .clone();
        Self::current_period_locked(state, account_id);
        account
    }

    fn latest_period_locked(state: &MemoryState, account_id: Uuid) -> Option<BillingPeriod> {
        state
            .periods
            .iter()
            .filter(|p| p.account_id == account_id)
            .max_by_key(|p| p.period_start)
            .cloned()
    }

    fn current_period_locked(state: &mut MemoryState, account_id: Uuid) -> BillingPeriod {
        let now = Utc::now();
        if let Some(period) = state
            .periods
            .iter()
            .filter(|p| p.account_id == account_id && p.contains(now))
            .max_by_key(|p| p.period_start)
        {
            return period.clone();
        }

        let period = BillingPeriod {
            period_id: Uuid::new_v4(),
            account_id,
            period_start: now,
            period_end: now + Duration::days(DEFAULT_PERIOD_DAYS),
            created_utc: now,
        };
        state.periods.push(period.clone());
        period
    }

    fn usage_total_locked(
        state: &MemoryState,
        account_id: Uuid,
        resource: ResourceType,
        period_id: Uuid,
    ) -> i64 {
        state
            .events
            .iter()
            .filter(|e| {
                e.account_id == account_id
                    && e.resource_type == resource.as_str()
                    && e.period_id == period_id
            })
            .map(|e| e.quantity as i64)
            .sum()
    }

    fn open_period_locked(
        state: &mut MemoryState,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BillingPeriod, AppError> {
        if end <= start {
            return Err(MeteringError::PeriodStateConflict {
                account_id,
                detail: "period end must be after period start".to_string(),
            }
            .into());
        }

        if let Some(current) = Self::latest_period_locked(state, account_id) {
            if start == current.period_start && end == current.period_end {
                return Ok(current);
            }

            if start == current.period_start {
                let period = state
                    .periods
                    .iter_mut()
                    .find(|p| p.period_id == current.period_id)
                    .expect("period disappeared under lock");
                period.period_end = end;
                return Ok(period.clone());
            }

            if start < current.period_start {
                // The processor's window supersedes the current period, but
                // must not reach back into closed history.
                let overlaps_closed = state
                    .periods
                    .iter()
                    .filter(|p| p.account_id == account_id && p.period_id != current.period_id)
                    .any(|p| p.period_end > start);
                if overlaps_closed {
                    return Err(MeteringError::PeriodStateConflict {
                        account_id,
                        detail: format!(
                            "new period starting {} overlaps a closed period",
                            start
                        ),
                    }
                    .into());
                }

                let period = state
                    .periods
                    .iter_mut()
                    .find(|p| p.period_id == current.period_id)
                    .expect("period disappeared under lock");
                period.period_start = start;
                period.period_end = end;
                return Ok(period.clone());
            }

            if current.period_end > start {
                let period = state
                    .periods
                    .iter_mut()
                    .find(|p| p.period_id == current.period_id)
                    .expect("period disappeared under lock");
                period.period_end = start;
            }
        }

        let period = BillingPeriod {
            period_id: Uuid::new_v4(),
            account_id,
            period_start: start,
            period_end: end,
            created_utc: Utc::now(),
        };
        state.periods.push(period.clone());
        Ok(period)
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn fetch_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self.lock().accounts.get(&account_id).cloned())
    }

    async fn ensure_account(&self, account_id: Uuid) -> Result<Account, AppError> {
        let mut state = self.lock();
        Ok(Self::ensure_account_locked(&mut state, account_id))
    }

    async fn find_account_by_refs(
        &self,
        customer_ref: Option<&str>,
        subscription_ref: Option<&str>,
    ) -> Result<Option<Account>, AppError> {
        let state = self.lock();

        if let Some(sub) = subscription_ref {
            if let Some(account) = state
                .accounts
                .values()
                .find(|a| a.processor_subscription_ref.as_deref() == Some(sub))
            {
                return Ok(Some(account.clone()));
            }
        }

        if let Some(cus) = customer_ref {
            if let Some(account) = state
                .accounts
                .values()
                .find(|a| a.processor_customer_ref.as_deref() == Some(cus))
            {
                return Ok(Some(account.clone()));
            }
        }

        Ok(None)
    }

    async fn bind_processor_refs(
        &self,
        account_id: Uuid,
        customer_ref: Option<&str>,
        subscription_ref: Option<&str>,
    ) -> Result<(), AppError> {
        let mut state = self.lock();
        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or(MeteringError::AccountNotFound(account_id))?;

        if let Some(cus) = customer_ref {
            account.processor_customer_ref = Some(cus.to_string());
        }
        if let Some(sub) = subscription_ref {
            account.processor_subscription_ref = Some(sub.to_string());
        }
        account.updated_utc = Utc::now();
        Ok(())
    }

    async fn update_tier_status(
        &self,
        account_id: Uuid,
        tier: Tier,
        status: SubscriptionStatus,
    ) -> Result<(), AppError> {
        let mut state = self.lock();
        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or(MeteringError::AccountNotFound(account_id))?;

        account.tier = tier.as_str().to_string();
        account.status = status.as_str().to_string();
        account.updated_utc = Utc::now();
        Ok(())
    }

    async fn clear_subscription_ref(&self, account_id: Uuid) -> Result<(), AppError> {
        let mut state = self.lock();
        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or(MeteringError::AccountNotFound(account_id))?;

        account.processor_subscription_ref = None;
        account.updated_utc = Utc::now();
        Ok(())
    }

    async fn current_period(&self, account_id: Uuid) -> Result<BillingPeriod, AppError> {
        let mut state = self.lock();
        Self::ensure_account_locked(&mut state, account_id);
        Ok(Self::current_period_locked(&mut state, account_id))
    }

    async fn open_period(
        &self,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BillingPeriod, AppError> {
        let mut state = self.lock();
        if !state.accounts.contains_key(&account_id) {
            return Err(MeteringError::AccountNotFound(account_id).into());
        }
        Self::open_period_locked(&mut state, account_id, start, end)
    }

    async fn list_periods(&self, account_id: Uuid) -> Result<Vec<BillingPeriod>, AppError> {
        let state = self.lock();
        let mut periods: Vec<BillingPeriod> = state
            .periods
            .iter()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();
        periods.sort_by_key(|p| p.period_start);
        Ok(periods)
    }

    async fn usage_total(
        &self,
        account_id: Uuid,
        resource: ResourceType,
        period_id: Uuid,
    ) -> Result<i64, AppError> {
        let state = self.lock();
        Ok(Self::usage_total_locked(&state, account_id, resource, period_id))
    }

    async fn record_usage(
        &self,
        account_id: Uuid,
        resource: ResourceType,
        quantity: i32,
    ) -> Result<RecordOutcome, AppError> {
        if quantity <= 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "quantity must be positive"
            )));
        }

        let mut state = self.lock();
        let account = Self::ensure_account_locked(&mut state, account_id);
        let tier = Tier::from_string(&account.tier);
        let limit = catalog::get_plan(tier).limits.for_resource(resource);

        let period = Self::current_period_locked(&mut state, account_id);
        let used = Self::usage_total_locked(&state, account_id, resource, period.period_id);

        if !limit.permits(used, quantity as i64) {
            return Ok(RecordOutcome::LimitExceeded {
                used,
                limit: limit.raw(),
            });
        }

        let event = UsageEvent {
            event_id: Uuid::new_v4(),
            account_id,
            resource_type: resource.as_str().to_string(),
            quantity,
            recorded_utc: Utc::now(),
            period_id: period.period_id,
        };
        state.events.push(event.clone());
        Ok(RecordOutcome::Recorded(event))
    }

    async fn is_event_processed(&self, event_id: &str) -> Result<bool, AppError> {
        Ok(self.lock().processed_events.contains(event_id))
    }

    async fn mark_event_processed(&self, event_id: &str) -> Result<(), AppError> {
        self.lock().processed_events.insert(event_id.to_string());
        Ok(())
    }

    async fn insert_payment(&self, input: &NewPaymentRecord) -> Result<(), AppError> {
        let mut state = self.lock();
        if state
            .payments
            .iter()
            .any(|p| p.processor_ref == input.processor_ref)
        {
            return Ok(());
        }

        state.payments.push(PaymentRecord {
            payment_id: Uuid::new_v4(),
            account_id: input.account_id,
            processor_ref: input.processor_ref.clone(),
            amount_cents: input.amount_cents,
            currency: input.currency.clone(),
            status: input.status.as_str().to_string(),
            description: input.description.clone(),
            created_utc: Utc::now(),
        });
        Ok(())
    }

    async fn list_payments(
        &self,
        account_id: Uuid,
        page_size: i32,
        page_token: Option<Uuid>,
    ) -> Result<Vec<PaymentRecord>, AppError> {
        let state = self.lock();
        let limit = page_size.clamp(1, 100) as usize;

        let mut payments: Vec<PaymentRecord> = state
            .payments
            .iter()
            .filter(|p| p.account_id == account_id)
            .filter(|p| page_token.map_or(true, |cursor| p.payment_id > cursor))
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.payment_id);
        payments.truncate(limit);
        Ok(payments)
    }
}
