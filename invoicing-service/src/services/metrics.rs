//! Prometheus metrics for invoicing-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Recorder behind the HTTP middleware's `metrics` counters.
static HTTP_METRICS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Invoice counter by operation.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_invoices_total",
        "Total number of invoice writes by operation",
        &["operation"] // created, paid, unpaid, deleted
    )
    .expect("Failed to register invoices_total")
});

/// Reminder outcomes.
pub static REMINDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_reminders_total",
        "Payment reminder emails by outcome",
        &["status"] // sent, failed, skipped
    )
    .expect("Failed to register reminders_total")
});

/// Contact backfill outcomes per (company, distributor) pair.
pub static ENTITY_MIGRATION_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_entity_migration_total",
        "Legacy contact pairs processed by the entity backfill",
        &["outcome"] // migrated, failed
    )
    .expect("Failed to register entity_migration_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicing_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics. Safe to call more than once per process.
pub fn init_metrics() {
    HTTP_METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    });

    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&REMINDERS_TOTAL);
    Lazy::force(&ENTITY_MIGRATION_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = HTTP_METRICS_HANDLE
        .get()
        .and_then(|handle| handle.as_ref().map(|h| h.render()))
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    output.push_str(&encoder.encode_to_string(&metric_families).unwrap_or_default());
    output
}
