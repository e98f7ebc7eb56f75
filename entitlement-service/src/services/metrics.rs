//! Metrics module for entitlement-service.
//! Provides Prometheus metrics for metering operations and webhook traffic.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "entitlement_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Entitlement check counter
pub static ENTITLEMENT_CHECKS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Usage events recorded counter
pub static USAGE_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Usage records denied counter
pub static USAGE_DENIALS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Billing webhook events counter
pub static BILLING_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    ENTITLEMENT_CHECKS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "entitlement_checks_total",
                "Total entitlement checks by resource type and outcome"
            ),
            &["resource_type", "outcome"]
        )
        .expect("Failed to register ENTITLEMENT_CHECKS_TOTAL")
    });

    USAGE_EVENTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "entitlement_usage_events_total",
                "Total usage events recorded by resource type"
            ),
            &["resource_type"]
        )
        .expect("Failed to register USAGE_EVENTS_TOTAL")
    });

    USAGE_DENIALS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "entitlement_usage_denials_total",
                "Total record attempts denied by resource type"
            ),
            &["resource_type"]
        )
        .expect("Failed to register USAGE_DENIALS_TOTAL")
    });

    BILLING_EVENTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "entitlement_billing_events_total",
                "Total processor billing events by type and disposition"
            ),
            &["event_type", "disposition"]
        )
        .expect("Failed to register BILLING_EVENTS_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "entitlement_errors_total",
                "Total errors by type for alerting"
            ),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}

/// Record an entitlement check outcome.
pub fn record_entitlement_check(resource_type: &str, outcome: &str) {
    if let Some(counter) = ENTITLEMENT_CHECKS_TOTAL.get() {
        counter.with_label_values(&[resource_type, outcome]).inc();
    }
}

/// Record a persisted usage event.
pub fn record_usage_event(resource_type: &str) {
    if let Some(counter) = USAGE_EVENTS_TOTAL.get() {
        counter.with_label_values(&[resource_type]).inc();
    }
}

/// Record a denied record attempt.
pub fn record_usage_denial(resource_type: &str) {
    if let Some(counter) = USAGE_DENIALS_TOTAL.get() {
        counter.with_label_values(&[resource_type]).inc();
    }
}

/// Record a billing event disposition.
pub fn record_billing_event(event_type: &str, disposition: &str) {
    if let Some(counter) = BILLING_EVENTS_TOTAL.get() {
        counter
            .with_label_values(&[event_type, disposition])
            .inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}
