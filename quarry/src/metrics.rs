//! Client observability metrics
//!
//! Prometheus-compatible metrics for cluster operations:
//! - Failover attempts and per-node failures
//! - Buffered row counts
//! - Flush duration, size, and requeue events

use std::time::Instant;

/// Record a node-level operation failure inside the failover loop
pub fn record_node_failure(host: &str, error_type: &str) {
    metrics::counter!(
        "quarry_node_failures_total",
        "host" => host.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Record a failover-loop success
pub fn record_failover_success(method: &str, host: &str) {
    metrics::counter!(
        "quarry_operations_total",
        "method" => method.to_string(),
        "host" => host.to_string(),
        "status" => "ok",
    )
    .increment(1);
}

/// Record a failover loop exhausting every node
pub fn record_cluster_unavailable(method: &str) {
    metrics::counter!(
        "quarry_operations_total",
        "method" => method.to_string(),
        "host" => "all".to_string(),
        "status" => "error",
    )
    .increment(1);
}

/// Record rows appended to a table's buffer
pub fn record_buffered_rows(table: &str, rows: usize) {
    metrics::counter!(
        "quarry_buffered_rows_total",
        "table" => table.to_string(),
    )
    .increment(rows as u64);
}

/// Record rows re-appended to the buffer after a failed flush
pub fn record_flush_requeued(table: &str, rows: usize) {
    metrics::counter!(
        "quarry_flush_requeued_rows_total",
        "table" => table.to_string(),
    )
    .increment(rows as u64);
}

/// Record a completed flush
pub fn record_flush(table: &str, rows: usize, groups: usize) {
    metrics::counter!(
        "quarry_flushes_total",
        "table" => table.to_string(),
        "status" => "ok",
    )
    .increment(1);

    metrics::histogram!(
        "quarry_flush_rows",
        "table" => table.to_string(),
    )
    .record(rows as f64);

    metrics::histogram!(
        "quarry_flush_schema_groups",
        "table" => table.to_string(),
    )
    .record(groups as f64);
}

/// Record a failed flush
pub fn record_flush_error(table: &str, error_type: &str) {
    metrics::counter!(
        "quarry_flushes_total",
        "table" => table.to_string(),
        "status" => "error",
    )
    .increment(1);

    metrics::counter!(
        "quarry_flush_errors_total",
        "table" => table.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Guard for timing flush operations
pub struct FlushTimer {
    table: String,
    start: Instant,
}

impl FlushTimer {
    /// Start timing a flush
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            start: Instant::now(),
        }
    }

    /// Record success, duration, and size
    pub fn success(self, rows: usize, groups: usize) {
        metrics::histogram!(
            "quarry_flush_duration_seconds",
            "table" => self.table.clone(),
        )
        .record(self.start.elapsed().as_secs_f64());
        record_flush(&self.table, rows, groups);
    }

    /// Record error and duration
    pub fn error(self, error_type: &str) {
        metrics::histogram!(
            "quarry_flush_duration_seconds",
            "table" => self.table.clone(),
        )
        .record(self.start.elapsed().as_secs_f64());
        record_flush_error(&self.table, error_type);
    }
}
