//! Prometheus metrics for the feed engine.
//!
//! This module provides metrics for:
//! - Batch load latency (simulated latency plus fetch)
//! - Batches and records appended to the feed
//! - Records excluded by classification
//! - Load requests dropped by the in-flight or exhaustion guards
//! - Fetch failures and catalog exhaustion

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

use crate::feed::DropReason;

// === Metric Name Constants ===

/// Batch load latency metric name.
pub const METRIC_LOAD_LATENCY: &str = "feed_load_latency_ms";
/// Batches loaded counter metric name.
pub const METRIC_BATCHES_LOADED: &str = "feed_batches_loaded_total";
/// Records appended counter metric name.
pub const METRIC_RECORDS_APPENDED: &str = "feed_records_appended_total";
/// Records excluded counter metric name.
pub const METRIC_RECORDS_EXCLUDED: &str = "feed_records_excluded_total";
/// Dropped load requests counter metric name.
pub const METRIC_LOADS_DROPPED: &str = "feed_load_requests_dropped_total";
/// Catalog exhaustion counter metric name.
pub const METRIC_CATALOG_EXHAUSTED: &str = "feed_catalog_exhausted_total";
/// Fetch failures counter metric name.
pub const METRIC_FETCH_FAILURES: &str = "feed_fetch_failures_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_LOAD_LATENCY,
        "Time from load start to batch settled in milliseconds"
    );

    describe_counter!(METRIC_BATCHES_LOADED, "Total number of non-empty batches appended");
    describe_counter!(
        METRIC_RECORDS_APPENDED,
        "Total number of records appended to the feed"
    );
    describe_counter!(
        METRIC_RECORDS_EXCLUDED,
        "Total number of appended records that do not render"
    );
    describe_counter!(
        METRIC_LOADS_DROPPED,
        "Total number of load requests dropped, by reason"
    );
    describe_counter!(
        METRIC_CATALOG_EXHAUSTED,
        "Total number of empty batches that ended the feed"
    );
    describe_counter!(METRIC_FETCH_FAILURES, "Total number of failed batch fetches");

    debug!("Metrics initialized");
}

/// Record how long a load took to settle.
pub fn record_load_latency(elapsed: Duration) {
    histogram!(METRIC_LOAD_LATENCY).record(elapsed.as_secs_f64() * 1000.0);
}

/// Record an appended batch.
pub fn record_batch_appended(appended: usize, rendered: usize) {
    counter!(METRIC_BATCHES_LOADED).increment(1);
    counter!(METRIC_RECORDS_APPENDED).increment(appended as u64);
    counter!(METRIC_RECORDS_EXCLUDED).increment(appended.saturating_sub(rendered) as u64);
}

/// Increment dropped load requests.
pub fn inc_load_dropped(reason: DropReason) {
    let reason: &'static str = reason.into();
    counter!(METRIC_LOADS_DROPPED, "reason" => reason).increment(1);
}

/// Increment catalog exhaustion counter.
pub fn inc_catalog_exhausted() {
    counter!(METRIC_CATALOG_EXHAUSTED).increment(1);
}

/// Increment fetch failures counter.
pub fn inc_fetch_failures() {
    counter!(METRIC_FETCH_FAILURES).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_recorder_is_a_noop() {
        init_metrics();
        record_load_latency(Duration::from_millis(800));
        record_batch_appended(20, 18);
        inc_load_dropped(DropReason::InFlight);
        inc_catalog_exhausted();
        inc_fetch_failures();
    }

    #[test]
    fn drop_reasons_label_in_snake_case() {
        let label: &'static str = DropReason::InFlight.into();
        assert_eq!(label, "in_flight");
        assert_eq!(DropReason::Exhausted.to_string(), "exhausted");
    }
}
