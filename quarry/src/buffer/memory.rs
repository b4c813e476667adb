//! In-memory write buffer
//!
//! Process-local backend with the same contract as the Redis buffer. One
//! mutex guards the whole table map, which makes append racing drain
//! trivially indivisible. Useful for single-process deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::row::Row;

use super::WriteBuffer;

#[derive(Default)]
struct TableBuffer {
    rows: Vec<Row>,
    first_buffered_at: i64,
}

/// Write buffer held in process memory
#[derive(Default)]
pub struct MemoryBuffer {
    tables: Mutex<HashMap<String, TableBuffer>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WriteBuffer for MemoryBuffer {
    async fn append(&self, table: &str, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.lock();
        let buffer = tables.entry(table.to_string()).or_insert_with(|| TableBuffer {
            rows: Vec::new(),
            first_buffered_at: chrono::Utc::now().timestamp(),
        });
        buffer.rows.extend_from_slice(rows);
        Ok(())
    }

    async fn pending_rows(&self, table: &str) -> Result<u64> {
        let tables = self.tables.lock();
        Ok(tables.get(table).map_or(0, |buffer| buffer.rows.len() as u64))
    }

    async fn first_buffered_at(&self, table: &str) -> Result<Option<i64>> {
        let tables = self.tables.lock();
        Ok(tables.get(table).map(|buffer| buffer.first_buffered_at))
    }

    async fn drain(&self, table: &str) -> Result<Vec<Row>> {
        let mut tables = self.tables.lock();
        Ok(tables
            .remove(table)
            .map(|buffer| buffer.rows)
            .unwrap_or_default())
    }

    async fn pending_tables(&self) -> Result<Vec<String>> {
        let tables = self.tables.lock();
        Ok(tables.keys().cloned().collect())
    }
}
