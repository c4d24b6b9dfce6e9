//! Metric descriptions for the `metrics` facade.
//!
//! Call sites record through the `metrics` macros directly. Without an
//! installed recorder every call is a no-op.

use metrics::Unit;

/// Registers descriptions for every metric the application emits.
pub fn describe() {
    metrics::describe_counter!(
        "lookups_total",
        Unit::Count,
        "Total number of reputation lookups, labeled by their outcome."
    );
    metrics::describe_histogram!(
        "lookup_duration_seconds",
        Unit::Seconds,
        "A histogram of the latency for reputation lookups."
    );
    metrics::describe_gauge!(
        "addresses_scanned",
        Unit::Count,
        "Unique candidate addresses found by the most recent log scan."
    );
}
