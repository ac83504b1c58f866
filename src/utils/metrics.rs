//! Prometheus metrics for the registration service.
//!
//! Counters cover registration outcomes, database operations, and WhatsApp
//! notification results; the totals are exported on `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

lazy_static! {
    pub static ref REGISTRATIONS: CounterVec = register_counter_vec!(
        "registration_attempts_total",
        "Number of registration attempts",
        // Exactly one terminal result per request:
        // "success", "validation_failed", "already_exists", "hash_error",
        // "store_error", "notify_failed", "notify_skipped"
        &["result"]
    )
    .expect("Failed to register REGISTRATIONS");

    pub static ref DB_OPERATIONS: CounterVec = register_counter_vec!(
        "registration_db_operations_total",
        "Number of database operations",
        // operation: "connection", "schema", "account_lookup",
        //            "account_create", "account_list"
        // result: "success", "failure", "duplicate"
        &["operation", "result"]
    )
    .expect("Failed to register DB_OPERATIONS");

    pub static ref NOTIFICATIONS: CounterVec = register_counter_vec!(
        "registration_whatsapp_notifications_total",
        "Number of WhatsApp notification attempts",
        // result: "success", "failure", "skipped"
        &["result"]
    )
    .expect("Failed to register NOTIFICATIONS");
}

/// Forces registration of all metrics at startup so they appear in the
/// exposition output before their first increment.
pub fn init() {
    lazy_static::initialize(&REGISTRATIONS);
    lazy_static::initialize(&DB_OPERATIONS);
    lazy_static::initialize(&NOTIFICATIONS);
}

/// Renders the current metric families in Prometheus text format.
pub fn render() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}
