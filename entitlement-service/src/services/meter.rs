//! Entitlement checking and usage recording.
//!
//! `check` is advisory, for display and pre-flight gating. `record` is the
//! authoritative gate; the store performs check-and-record as one atomic
//! unit, so the caller only ever observes success or `LimitExceeded`.

use std::collections::BTreeMap;
use std::sync::Arc;

use service_core::error::AppError;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    DenialReason, EntitlementResult, RecordResult, ResourceType, ResourceUsage,
    SubscriptionStatus, Tier, UsageOverview,
};
use crate::services::catalog;
use crate::services::metrics::{record_entitlement_check, record_usage_denial, record_usage_event};
use crate::services::store::{EntitlementStore, RecordOutcome};

#[derive(Clone)]
pub struct UsageMeter {
    store: Arc<dyn EntitlementStore>,
}

impl UsageMeter {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    /// May this account consume one more unit of `resource`?
    ///
    /// An account with no subscription record is treated as Free tier with a
    /// freshly opened billing period rather than failing.
    pub async fn check(
        &self,
        account_id: Uuid,
        resource: ResourceType,
    ) -> Result<EntitlementResult, AppError> {
        let account = self.store.ensure_account(account_id).await?;
        let tier = Tier::from_string(&account.tier);
        let limit = catalog::get_plan(tier).limits.for_resource(resource);

        let period = self.store.current_period(account_id).await?;
        let used = self
            .store
            .usage_total(account_id, resource, period.period_id)
            .await?;

        let allowed = limit.permits(used, 1);
        record_entitlement_check(resource.as_str(), if allowed { "allowed" } else { "denied" });

        Ok(EntitlementResult {
            allowed,
            used,
            limit,
            remaining: limit.remaining(used),
        })
    }

    /// Append a usage event unless doing so would exceed the plan limit.
    pub async fn record(
        &self,
        account_id: Uuid,
        resource: ResourceType,
        quantity: i32,
    ) -> Result<RecordResult, AppError> {
        match self.store.record_usage(account_id, resource, quantity).await? {
            RecordOutcome::Recorded(event) => {
                info!(
                    account_id = %account_id,
                    resource_type = resource.as_str(),
                    quantity = quantity,
                    event_id = %event.event_id,
                    "Usage recorded"
                );
                record_usage_event(resource.as_str());
                Ok(RecordResult {
                    success: true,
                    reason: None,
                })
            }
            RecordOutcome::LimitExceeded { used, limit } => {
                info!(
                    account_id = %account_id,
                    resource_type = resource.as_str(),
                    used = used,
                    limit = limit,
                    "Usage denied, limit exceeded"
                );
                record_usage_denial(resource.as_str());
                Ok(RecordResult {
                    success: false,
                    reason: Some(DenialReason::LimitExceeded),
                })
            }
        }
    }

    /// Current-period usage across every resource type, for display.
    pub async fn usage_overview(&self, account_id: Uuid) -> Result<UsageOverview, AppError> {
        let account = self.store.ensure_account(account_id).await?;
        let tier = Tier::from_string(&account.tier);
        let status = SubscriptionStatus::from_string(&account.status);
        let limits = &catalog::get_plan(tier).limits;

        let period = self.store.current_period(account_id).await?;

        let mut usage = BTreeMap::new();
        for resource in ResourceType::ALL {
            let limit = limits.for_resource(resource);
            let used = self
                .store
                .usage_total(account_id, resource, period.period_id)
                .await?;
            usage.insert(
                resource.as_str(),
                ResourceUsage {
                    used,
                    limit,
                    remaining: limit.remaining(used),
                },
            );
        }

        Ok(UsageOverview {
            account_id,
            tier,
            status,
            period_start: period.period_start,
            period_end: period.period_end,
            usage,
        })
    }
}
