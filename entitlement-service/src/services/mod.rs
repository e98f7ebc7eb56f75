//! Services module for entitlement-service.

pub mod billing_events;
pub mod catalog;
pub mod database;
pub mod memory;
pub mod meter;
pub mod metrics;
pub mod store;

pub use billing_events::{BillingEventAdapter, EventDisposition};
pub use database::Database;
pub use memory::MemoryStore;
pub use meter::UsageMeter;
pub use metrics::{
    get_metrics, init_metrics, record_billing_event, record_entitlement_check, record_error,
    record_usage_denial, record_usage_event,
};
pub use store::{EntitlementStore, RecordOutcome};
