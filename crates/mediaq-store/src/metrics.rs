//! Store metrics collection.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Successful store writes by operation.
    pub const WRITES_TOTAL: &str = "mediaq_store_writes_total";

    /// Writes rejected by a failed precondition, by operation.
    pub const PRECONDITION_FAILURES_TOTAL: &str = "mediaq_store_precondition_failures_total";
}

/// Record a committed write.
pub fn record_write(operation: &str) {
    counter!(
        names::WRITES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a write rejected by its precondition.
pub fn record_precondition_failure(operation: &str) {
    counter!(
        names::PRECONDITION_FAILURES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}
