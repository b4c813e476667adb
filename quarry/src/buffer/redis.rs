//! Redis-backed write buffer
//!
//! Key layout under the configured prefix:
//! - `{prefix}{table}` — ordered list of JSON-serialized rows (RPUSH)
//! - `{prefix}{table}:ts` — first-buffered epoch seconds (SETNX)
//! - `{prefix}table_list` — registry set of tables with pending data
//!
//! Both sides run as MULTI/EXEC transactions: the append commits registry
//! membership, first-buffered timestamp, and rows in one step, and the
//! drain runs LRANGE + DEL + DEL + SREM as one step. A drain serialized
//! between a non-atomic append's SADD and RPUSH would leave rows in the
//! list with no registry entry, hiding the table from external sweeps.

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::config::BufferStoreConfig;
use crate::error::{ClusterError, Result};
use crate::row::Row;

use super::WriteBuffer;

/// Write buffer persisted in a shared Redis instance
#[derive(Debug)]
pub struct RedisBuffer {
    client: redis::Client,
    prefix: String,
}

impl RedisBuffer {
    /// Open a buffer from store configuration
    pub fn new(config: &BufferStoreConfig, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(config.url())
            .map_err(|e| ClusterError::Config(format!("invalid buffer store config: {}", e)))?;
        Ok(Self::with_client(client, prefix))
    }

    /// Reuse a pre-built client handle instead of opening one
    pub fn with_client(client: redis::Client, prefix: &str) -> Self {
        Self {
            client,
            prefix: prefix.to_string(),
        }
    }

    fn list_key(&self, table: &str) -> String {
        format!("{}{}", self.prefix, table)
    }

    fn ts_key(&self, table: &str) -> String {
        format!("{}{}:ts", self.prefix, table)
    }

    fn registry_key(&self) -> String {
        format!("{}table_list", self.prefix)
    }

    fn append_pipeline(&self, table: &str, payloads: Vec<String>) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .sadd(self.registry_key(), table)
            .ignore()
            .set_nx(self.ts_key(table), chrono::Utc::now().timestamp())
            .ignore()
            .rpush(self.list_key(table), payloads)
            .ignore();
        pipe
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl WriteBuffer for RedisBuffer {
    async fn append(&self, table: &str, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let payloads: Vec<String> = rows
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<_, _>>()?;

        let mut conn = self.connection().await?;
        self.append_pipeline(table, payloads)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn pending_rows(&self, table: &str) -> Result<u64> {
        let mut conn = self.connection().await?;
        let count: u64 = conn.llen(self.list_key(table)).await?;
        Ok(count)
    }

    async fn first_buffered_at(&self, table: &str) -> Result<Option<i64>> {
        let mut conn = self.connection().await?;
        let stamp: Option<i64> = conn.get(self.ts_key(table)).await?;
        Ok(stamp)
    }

    async fn drain(&self, table: &str) -> Result<Vec<Row>> {
        let mut conn = self.connection().await?;
        let (payloads,): (Vec<String>,) = redis::pipe()
            .atomic()
            .lrange(self.list_key(table), 0, -1)
            .del(self.list_key(table))
            .ignore()
            .del(self.ts_key(table))
            .ignore()
            .srem(self.registry_key(), table)
            .ignore()
            .query_async(&mut conn)
            .await?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(ClusterError::from))
            .collect()
    }

    async fn pending_tables(&self) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let tables: Vec<String> = conn.smembers(self.registry_key()).await?;
        Ok(tables)
    }
}
