//! Cluster client façade
//!
//! Routes queries and truncates through the pool's failover loop, and
//! routes bulk inserts through the shared write buffer with time/size
//! triggered flushing. One logical database, many physical nodes.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::buffer::{FlushThresholds, RedisBuffer, WriteBuffer};
use crate::config::{BufferStoreConfig, ClientConfig, NodeEndpoint};
use crate::diag::DiagnosticLog;
use crate::error::Result;
use crate::metrics::{self, FlushTimer};
use crate::node::{HttpNode, NodeConnection};
use crate::pool::NodePool;
use crate::quote;
use crate::row::{group_by_schema, Row};

/// Resilient write/query client for a cluster of columnar-database nodes
pub struct ClusterClient {
    pool: NodePool,
    buffer: Arc<dyn WriteBuffer>,
    thresholds: FlushThresholds,
    diag: Arc<DiagnosticLog>,
}

impl std::fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient")
            .field("pool", &self.pool)
            .field("thresholds", &self.thresholds)
            .field("diag", &self.diag)
            .finish_non_exhaustive()
    }
}

impl ClusterClient {
    /// Connect to the cluster and the shared buffer store.
    ///
    /// Endpoints that fail to connect are dropped from the pool and never
    /// retried later. Zero usable nodes is a hard configuration error.
    pub async fn connect(
        endpoints: Vec<NodeEndpoint>,
        store: BufferStoreConfig,
        config: ClientConfig,
    ) -> Result<Self> {
        let buffer = RedisBuffer::new(&store, &config.key_prefix)?;
        Self::connect_with_buffer(endpoints, Arc::new(buffer), config).await
    }

    /// Connect to the cluster with a pre-built buffer backend
    pub async fn connect_with_buffer(
        endpoints: Vec<NodeEndpoint>,
        buffer: Arc<dyn WriteBuffer>,
        config: ClientConfig,
    ) -> Result<Self> {
        let diag = DiagnosticLog::new(&config.diagnostic_path);
        let mut nodes: Vec<Arc<dyn NodeConnection>> = Vec::new();
        for endpoint in &endpoints {
            match HttpNode::connect(endpoint, config.connect_timeout(), config.request_timeout())
                .await
            {
                Ok(node) => {
                    info!(host = %endpoint.host, "cluster node connected");
                    nodes.push(Arc::new(node));
                }
                Err(e) => {
                    warn!(host = %endpoint.host, error = %e, "dropping unreachable cluster node");
                    diag.record(&endpoint.host, &e.to_string());
                    metrics::record_node_failure(&endpoint.host, e.error_type());
                    tokio::time::sleep(config.failover_backoff()).await;
                }
            }
        }
        Self::from_parts(nodes, buffer, config)
    }

    /// Build a client from already-established connections.
    ///
    /// Zero nodes is still a configuration error: a cluster client always
    /// owns at least one live connection, or it does not exist.
    pub fn from_parts(
        nodes: Vec<Arc<dyn NodeConnection>>,
        buffer: Arc<dyn WriteBuffer>,
        config: ClientConfig,
    ) -> Result<Self> {
        let diag = Arc::new(DiagnosticLog::new(&config.diagnostic_path));
        let pool = NodePool::new(nodes, config.failover_backoff(), diag.clone())?;
        Ok(Self {
            pool,
            buffer,
            thresholds: config.thresholds(),
            diag,
        })
    }

    /// Hosts of the live pooled connections
    pub fn hosts(&self) -> Vec<&str> {
        self.pool.hosts()
    }

    /// A uniform-random pooled connection, for callers that want one
    /// sticky node rather than the failover loop
    pub fn random_node(&self) -> Arc<dyn NodeConnection> {
        self.pool.random_node()
    }

    /// Run a write/DDL statement against one node, failing over as needed
    pub async fn query(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.pool
            .for_each_node("query", move |node| {
                let sql = sql.clone();
                async move { node.execute(&sql).await }
            })
            .await
    }

    /// Run a read statement and return all rows
    pub async fn select_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let sql = sql.to_string();
        self.pool
            .for_each_node("select", move |node| {
                let sql = sql.clone();
                async move { node.select(&sql).await }
            })
            .await
    }

    /// Run a read statement and return the first row, if any
    pub async fn select_first_row(&self, sql: &str) -> Result<Option<Row>> {
        let rows = self.select_rows(sql).await?;
        Ok(rows.into_iter().next())
    }

    /// Run a read statement and descend into the first row and first
    /// column until a scalar is reached. Empty result sets yield `None`,
    /// not an error.
    pub async fn select_scalar(&self, sql: &str) -> Result<Option<Value>> {
        let rows = self.select_rows(sql).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(Row::into_first_value)
            .and_then(descend_to_scalar))
    }

    /// Format a value as a SQL literal
    pub fn quote(&self, value: &Value) -> String {
        quote::quote(value)
    }

    /// Truncate a table on one node, failing over as needed
    pub async fn truncate_table(&self, table: &str) -> Result<()> {
        let table = table.to_string();
        self.pool
            .for_each_node("truncate", move |node| {
                let table = table.clone();
                async move { node.truncate(&table).await }
            })
            .await
    }

    /// Select the session database on every node
    pub async fn use_database(&self, database: &str) -> Result<()> {
        self.pool.use_database(database).await
    }

    /// Buffer rows for `table` and flush if the table crossed a threshold.
    ///
    /// Rows land in the shared buffer first; the actual cluster write
    /// happens when the table's buffer exceeds the row or age limit, or on
    /// a later [`dump`](Self::dump).
    pub async fn insert_multiple(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        metrics::record_buffered_rows(table, rows.len());
        self.buffer.append(table, &rows).await?;
        self.maybe_flush(table, false).await
    }

    /// Flush `table`'s buffer to the cluster if forced or due.
    ///
    /// The drained rows are regrouped by column schema and each group is
    /// bulk-inserted through the failover loop; only the first successful
    /// node receives a group (the cluster converges via its own
    /// replication). When every node fails, the drained rows are
    /// re-appended to the buffer before the error propagates, so a total
    /// outage delays data instead of dropping it.
    pub async fn maybe_flush(&self, table: &str, force: bool) -> Result<()> {
        let pending = self.buffer.pending_rows(table).await?;
        let first_at = self.buffer.first_buffered_at(table).await?;
        let now = chrono::Utc::now().timestamp();
        if !self.thresholds.should_flush(pending, first_at, now, force) {
            return Ok(());
        }

        let rows = self.buffer.drain(table).await?;
        if rows.is_empty() {
            return Ok(());
        }

        let total = rows.len();
        let groups = group_by_schema(rows);
        let group_count = groups.len();
        let timer = FlushTimer::new(table);

        for (index, group) in groups.iter().enumerate() {
            let table_owned = table.to_string();
            let batch = group.clone();
            let result = self
                .pool
                .for_each_node("bulk_insert", move |node| {
                    let table = table_owned.clone();
                    let rows = batch.clone();
                    async move {
                        node.bulk_insert(&table, &rows).await?;
                        Ok(node.host().to_string())
                    }
                })
                .await;

            match result {
                Ok(host) => {
                    self.diag.record(&host, "successfully written");
                }
                Err(e) => {
                    let requeue: Vec<Row> = groups[index..].iter().flatten().cloned().collect();
                    let count = requeue.len();
                    match self.buffer.append(table, &requeue).await {
                        Ok(()) => {
                            warn!(table, rows = count, error = %e, "flush failed, rows re-buffered");
                            metrics::record_flush_requeued(table, count);
                        }
                        Err(requeue_err) => {
                            warn!(table, rows = count, error = %requeue_err, "flush failed and re-buffering failed, rows lost");
                        }
                    }
                    timer.error(e.error_type());
                    return Err(e);
                }
            }
        }

        timer.success(total, group_count);
        Ok(())
    }

    /// Flush every pending table.
    ///
    /// With `force` set, thresholds are ignored and every registered
    /// table drains. An external scheduler is expected to call this
    /// periodically: staleness is otherwise only detected on the next
    /// insert to the same table.
    pub async fn dump(&self, force: bool) -> Result<()> {
        for table in self.buffer.pending_tables().await? {
            self.maybe_flush(&table, force).await?;
        }
        Ok(())
    }
}

fn descend_to_scalar(value: Value) -> Option<Value> {
    match value {
        Value::Array(items) => items.into_iter().next().and_then(descend_to_scalar),
        Value::Object(entries) => entries
            .into_iter()
            .next()
            .map(|(_, inner)| inner)
            .and_then(descend_to_scalar),
        scalar => Some(scalar),
    }
}
