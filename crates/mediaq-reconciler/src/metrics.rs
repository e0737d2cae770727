//! Poller metrics.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total poller ticks, labelled by result.
    pub const TICKS_TOTAL: &str = "mediaq_poller_ticks_total";

    /// Per-item reconciliation outcomes.
    pub const ITEMS_RECONCILED_TOTAL: &str = "mediaq_items_reconciled_total";

    /// Extraction trigger attempts, labelled by result.
    pub const EXTRACTION_TRIGGERED_TOTAL: &str = "mediaq_extraction_triggered_total";

    /// Wall time of one tick.
    pub const TICK_DURATION_SECONDS: &str = "mediaq_tick_duration_seconds";

    /// Active items seen by the latest tick.
    pub const ACTIVE_ITEMS: &str = "mediaq_active_items";
}

/// Record a finished tick.
pub fn record_tick(result: &str, duration: Duration, active: usize) {
    counter!(names::TICKS_TOTAL, "result" => result.to_string()).increment(1);
    histogram!(names::TICK_DURATION_SECONDS).record(duration.as_secs_f64());
    gauge!(names::ACTIVE_ITEMS).set(active as f64);
}

/// Record one item's reconciliation outcome.
pub fn record_item_outcome(outcome: &str) {
    counter!(names::ITEMS_RECONCILED_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

/// Record an extraction trigger attempt.
pub fn record_extraction(result: &str) {
    counter!(names::EXTRACTION_TRIGGERED_TOTAL, "result" => result.to_string()).increment(1);
}
