//! Request metrics.
//!
//! # Metrics
//! - `courier_requests_total` (counter): settled requests by method, outcome
//! - `courier_request_duration_seconds` (histogram): latency by method
//! - `courier_adapter_resolutions_total` (counter): adapter lookups by adapter, result
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - A process-wide switch lets settings turn recording off

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn recording on or off for the whole process.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record a settled request. `outcome` is a status code or an error code.
pub fn record_request(method: &str, outcome: &str, start: Instant) {
    if !is_enabled() {
        return;
    }
    metrics::counter!(
        "courier_requests_total",
        "method" => method.to_uppercase(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "courier_request_duration_seconds",
        "method" => method.to_uppercase()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one adapter resolution.
pub fn record_adapter_resolution(adapter: &str, resolved: bool) {
    if !is_enabled() {
        return;
    }
    metrics::counter!(
        "courier_adapter_resolutions_total",
        "adapter" => adapter.to_string(),
        "result" => if resolved { "resolved" } else { "rejected" }
    )
    .increment(1);
}
