//! Quarry - resilient write/query client for columnar database clusters
//!
//! Callers issue queries and inserts against one logical database while the
//! client load-balances across physical nodes, tolerates node failures, and
//! coalesces small inserts into few large bulk writes (columnar engines are
//! inefficient at small, frequent inserts).
//!
//! # Architecture
//!
//! - **Node**: thin HTTP adapter over a single endpoint; no retry here
//! - **Pool**: live connections plus the failover loop (fresh random order
//!   per call, first success wins, all-failed is fatal)
//! - **Buffer**: shared table-keyed staging area with atomic drain; Redis
//!   backed for multi-process deployments, in-memory for single-process
//! - **Client**: the façade wiring buffer thresholds, schema grouping, and
//!   the failover loop together
//!
//! # Write path
//!
//! `insert_multiple(table, rows)` appends to the table's shared buffer and
//! flushes once the buffer crosses the row-count or age threshold. A flush
//! drains the buffer atomically, regroups rows by column schema (one
//! bulk-insert call cannot mix differing column sets), and writes each
//! group to the first node that accepts it. There is no background timer:
//! an external scheduler should call [`ClusterClient::dump`] periodically
//! so tables that stop receiving inserts still drain.

pub mod buffer;
pub mod config;
pub mod diag;
pub mod error;
pub mod metrics;
pub mod node;
pub mod quote;
pub mod row;

mod client;
mod pool;

pub use buffer::{FlushThresholds, MemoryBuffer, RedisBuffer, WriteBuffer};
pub use client::ClusterClient;
pub use config::{BufferStoreConfig, ClientConfig, NodeEndpoint};
pub use diag::DiagnosticLog;
pub use error::{ClusterError, Result};
pub use node::{HttpNode, NodeConnection};
pub use pool::NodePool;
pub use quote::quote;
pub use row::{group_by_schema, Row, SchemaKey};
