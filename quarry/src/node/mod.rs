//! Node connection trait and backends
//!
//! A [`NodeConnection`] is a single physical endpoint capability. Calls fail
//! with a connectivity or driver error on network or server-side fault; no
//! retry happens at this layer. Retry across nodes is the pool's job.

mod http;

pub use http::HttpNode;

use async_trait::async_trait;

use crate::error::Result;
use crate::row::Row;

/// One physical database-cluster endpoint
#[async_trait]
pub trait NodeConnection: Send + Sync {
    /// Run a read statement and return its rows
    async fn select(&self, sql: &str) -> Result<Vec<Row>>;

    /// Run a write/DDL statement
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Bulk-insert a homogeneous batch. Every row must share one ordered
    /// column set; mixed batches are the caller's bug.
    async fn bulk_insert(&self, table: &str, rows: &[Row]) -> Result<()>;

    /// Truncate a table
    async fn truncate(&self, table: &str) -> Result<()>;

    /// Select the session database for subsequent calls on this node
    async fn use_database(&self, database: &str) -> Result<()>;

    /// Host this connection points at, for diagnostics and metrics
    fn host(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable in-memory node for failover and flush tests

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::error::{ClusterError, Result};
    use crate::row::Row;

    use super::NodeConnection;

    /// Mock node with a switchable health flag. While unhealthy, every
    /// operation fails with `NodeUnavailable`.
    pub struct MockNode {
        host: String,
        healthy: AtomicBool,
        // Remaining successful operations before the node starts failing
        success_budget: Mutex<Option<usize>>,
        pub attempts: AtomicUsize,
        pub select_rows: Mutex<Vec<Row>>,
        pub executed: Mutex<Vec<String>>,
        pub inserts: Mutex<Vec<(String, Vec<Row>)>>,
        pub truncated: Mutex<Vec<String>>,
        pub databases: Mutex<Vec<String>>,
    }

    impl MockNode {
        pub fn healthy(host: &str) -> Self {
            Self::new(host, true)
        }

        pub fn unhealthy(host: &str) -> Self {
            Self::new(host, false)
        }

        fn new(host: &str, healthy: bool) -> Self {
            Self {
                host: host.to_string(),
                healthy: AtomicBool::new(healthy),
                success_budget: Mutex::new(None),
                attempts: AtomicUsize::new(0),
                select_rows: Mutex::new(Vec::new()),
                executed: Mutex::new(Vec::new()),
                inserts: Mutex::new(Vec::new()),
                truncated: Mutex::new(Vec::new()),
                databases: Mutex::new(Vec::new()),
            }
        }

        pub fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }

        /// Let the next `budget` operations succeed, then fail every later one
        pub fn fail_after(&self, budget: usize) {
            *self.success_budget.lock() = Some(budget);
        }

        pub fn with_select_rows(self, rows: Vec<Row>) -> Self {
            *self.select_rows.lock() = rows;
            self
        }

        fn check(&self) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let refused = || {
                Err(ClusterError::NodeUnavailable(format!(
                    "{}: connection refused",
                    self.host
                )))
            };
            if !self.healthy.load(Ordering::SeqCst) {
                return refused();
            }
            if let Some(budget) = self.success_budget.lock().as_mut() {
                if *budget == 0 {
                    return refused();
                }
                *budget -= 1;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl NodeConnection for MockNode {
        async fn select(&self, _sql: &str) -> Result<Vec<Row>> {
            self.check()?;
            Ok(self.select_rows.lock().clone())
        }

        async fn execute(&self, sql: &str) -> Result<()> {
            self.check()?;
            self.executed.lock().push(sql.to_string());
            Ok(())
        }

        async fn bulk_insert(&self, table: &str, rows: &[Row]) -> Result<()> {
            self.check()?;
            self.inserts.lock().push((table.to_string(), rows.to_vec()));
            Ok(())
        }

        async fn truncate(&self, table: &str) -> Result<()> {
            self.check()?;
            self.truncated.lock().push(table.to_string());
            Ok(())
        }

        async fn use_database(&self, database: &str) -> Result<()> {
            self.check()?;
            self.databases.lock().push(database.to_string());
            Ok(())
        }

        fn host(&self) -> &str {
            &self.host
        }
    }
}
