//! Domain models for entitlement-service.

mod account;
mod event;
mod period;
mod plan;
mod usage;

pub use account::{Account, SubscriptionStatus, Tier};
pub use event::{
    BillingEvent, BillingEventType, NewPaymentRecord, PaymentRecord, PaymentStatus,
};
pub use period::{BillingPeriod, DEFAULT_PERIOD_DAYS};
pub use plan::{Limit, Plan, PlanLimits};
pub use usage::{
    DenialReason, EntitlementResult, RecordResult, ResourceType, ResourceUsage, UsageEvent,
    UsageOverview,
};
