//! Shared write buffer
//!
//! Rows headed for the cluster are staged per destination table in a shared
//! store and committed in bulk. The store is the only shared mutable
//! resource: several processes append concurrently and a drain must read
//! and clear a table's pending list as one indivisible step, so a racing
//! append lands entirely before the drain (and is flushed) or entirely
//! after (and starts a fresh buffer).
//!
//! Backends: [`RedisBuffer`] for the multi-process deployment the client is
//! built for, [`MemoryBuffer`] for single-process use and tests.

mod memory;
mod redis;

pub use memory::MemoryBuffer;
pub use redis::RedisBuffer;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::row::Row;

/// Table-keyed staging area for pending rows
#[async_trait]
pub trait WriteBuffer: Send + Sync {
    /// Register the table, stamp the first-buffered time if absent, and
    /// append `rows` to the table's ordered pending list. Must never drop
    /// or reorder previously buffered rows.
    async fn append(&self, table: &str, rows: &[Row]) -> Result<()>;

    /// Number of rows currently pending for `table`
    async fn pending_rows(&self, table: &str) -> Result<u64>;

    /// Epoch seconds of the first append since the last drain, if any
    async fn first_buffered_at(&self, table: &str) -> Result<Option<i64>>;

    /// Atomically read and clear the table's pending list, its timestamp,
    /// and its registry membership in one indivisible step.
    async fn drain(&self, table: &str) -> Result<Vec<Row>>;

    /// Tables with pending data, for the forced all-tables sweep
    async fn pending_tables(&self) -> Result<Vec<String>>;
}

/// Size and age limits that trigger a flush.
///
/// Best-effort by design: there is no lock across "check size" and
/// "append", so thresholds are checked after the append that may have
/// crossed them, never at the exact boundary. Staleness is likewise only
/// detected on the next touch of the table; an external scheduler has to
/// call `dump` for tables that stop receiving inserts.
#[derive(Debug, Clone, Copy)]
pub struct FlushThresholds {
    pub max_rows: u64,
    pub max_age: Duration,
}

impl FlushThresholds {
    /// Decide whether a table's buffer is due for a flush
    pub fn should_flush(
        &self,
        pending_rows: u64,
        first_buffered_at: Option<i64>,
        now: i64,
        force: bool,
    ) -> bool {
        if force {
            return true;
        }
        if pending_rows > self.max_rows {
            return true;
        }
        match first_buffered_at {
            Some(first) => now - first > self.max_age.as_secs() as i64,
            // Rows without a timestamp have lost their age; treat as stale
            None => pending_rows > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> FlushThresholds {
        FlushThresholds {
            max_rows: 100,
            max_age: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_force_always_flushes() {
        assert!(thresholds().should_flush(0, None, 0, true));
    }

    #[test]
    fn test_row_count_threshold_is_strict() {
        let t = thresholds();
        assert!(!t.should_flush(100, Some(1000), 1000, false));
        assert!(t.should_flush(101, Some(1000), 1000, false));
    }

    #[test]
    fn test_age_threshold_is_strict() {
        let t = thresholds();
        assert!(!t.should_flush(1, Some(1000), 1060, false));
        assert!(t.should_flush(1, Some(1000), 1061, false));
    }

    #[test]
    fn test_missing_timestamp_counts_as_stale() {
        let t = thresholds();
        assert!(t.should_flush(1, None, 0, false));
        assert!(!t.should_flush(0, None, 0, false));
    }
}
