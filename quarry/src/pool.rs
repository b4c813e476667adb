//! Node pool and failover protocol
//!
//! The pool holds the connections that survived construction and never
//! changes membership afterwards. Each resilient call walks the nodes in a
//! fresh random order, so consecutive calls spread load instead of hammering
//! one node. Order lives in a per-call permutation; the shared node list is
//! never reordered.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use crate::diag::DiagnosticLog;
use crate::error::{ClusterError, Result};
use crate::metrics;
use crate::node::NodeConnection;

/// The set of live node connections
pub struct NodePool {
    nodes: Vec<Arc<dyn NodeConnection>>,
    backoff: Duration,
    diag: Arc<DiagnosticLog>,
}

impl std::fmt::Debug for NodePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodePool")
            .field("backoff", &self.backoff)
            .field("diag", &self.diag)
            .finish_non_exhaustive()
    }
}

impl NodePool {
    /// Build a pool from already-established connections.
    ///
    /// A cluster client always owns at least one live connection, or it
    /// does not exist.
    pub fn new(
        nodes: Vec<Arc<dyn NodeConnection>>,
        backoff: Duration,
        diag: Arc<DiagnosticLog>,
    ) -> Result<Self> {
        if nodes.is_empty() {
            return Err(ClusterError::Config(
                "no usable cluster nodes".to_string(),
            ));
        }
        Ok(Self {
            nodes,
            backoff,
            diag,
        })
    }

    /// Number of pooled connections, always at least one
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Hosts of the pooled connections, in construction order
    pub fn hosts(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.host()).collect()
    }

    fn permutation(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.shuffle(&mut rand::thread_rng());
        order
    }

    /// Uniform-random pick for operations that want one sticky connection
    /// rather than the failover loop.
    pub fn random_node(&self) -> Arc<dyn NodeConnection> {
        let index = rand::thread_rng().gen_range(0..self.nodes.len());
        self.nodes[index].clone()
    }

    /// Try `op` against each node in a fresh random order, short-circuiting
    /// on the first success. Node-level failures are logged, backed off,
    /// and skipped; when every node fails the call fails with
    /// [`ClusterError::ClusterUnavailable`].
    pub async fn for_each_node<T, F, Fut>(&self, method: &'static str, op: F) -> Result<T>
    where
        F: Fn(Arc<dyn NodeConnection>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        for index in self.permutation() {
            let node = self.nodes[index].clone();
            match op(node.clone()).await {
                Ok(value) => {
                    metrics::record_failover_success(method, node.host());
                    return Ok(value);
                }
                Err(e) => {
                    warn!(host = node.host(), method, error = %e, "node operation failed, trying next node");
                    self.diag.record(node.host(), &e.to_string());
                    metrics::record_node_failure(node.host(), e.error_type());
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
        metrics::record_cluster_unavailable(method);
        Err(ClusterError::ClusterUnavailable(format!(
            "all {} nodes failed for {}",
            self.nodes.len(),
            method
        )))
    }

    /// Broadcast a session-database change to every node.
    ///
    /// Not a failover call: database selection is a precondition for later
    /// calls on that same node, so a failure is retried once in place
    /// instead of being skipped.
    pub async fn use_database(&self, database: &str) -> Result<()> {
        for node in &self.nodes {
            if let Err(e) = node.use_database(database).await {
                warn!(host = node.host(), error = %e, "database selection failed, retrying once");
                self.diag.record(node.host(), &e.to_string());
                tokio::time::sleep(self.backoff).await;
                node.use_database(database).await?;
            }
        }
        Ok(())
    }
}
