//! HTTP node adapter
//!
//! Thin adapter over the columnar engine's HTTP interface. Selects append
//! `FORMAT JSONEachRow` and parse one row per response line; bulk inserts
//! post an `INSERT ... FORMAT JSONEachRow` statement with one JSON object
//! per row.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use tracing::debug;

use crate::config::NodeEndpoint;
use crate::error::{ClusterError, Result};
use crate::row::Row;

use super::NodeConnection;

/// A single endpoint reached over HTTP
pub struct HttpNode {
    http: Client,
    base_url: String,
    host: String,
    login: String,
    password: Option<String>,
    // Session database, swapped by use_database for subsequent calls
    database: RwLock<String>,
}

impl HttpNode {
    /// Connect to an endpoint, probing liveness with a trivial select.
    /// Fails construction when the node is unreachable so the pool only
    /// ever holds live connections.
    pub async fn connect(
        endpoint: &NodeEndpoint,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        let node = Self {
            http,
            base_url: endpoint.url(),
            host: endpoint.host.clone(),
            login: endpoint.login.clone(),
            password: endpoint.password.clone(),
            database: RwLock::new(endpoint.database.clone()),
        };

        node.send("SELECT 1".to_string()).await?;
        debug!(host = %node.host, "connected to cluster node");
        Ok(node)
    }

    async fn send(&self, sql: String) -> Result<String> {
        let database = self.database.read().clone();
        let mut request = self
            .http
            .post(&self.base_url)
            .query(&[("database", database.as_str())])
            .header("X-ClickHouse-User", &self.login)
            .body(sql);
        if let Some(password) = &self.password {
            request = request.header("X-ClickHouse-Key", password);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterError::NodeUnavailable(format!(
                "{} returned {}: {}",
                self.host,
                status,
                body.trim()
            )));
        }
        Ok(response.text().await?)
    }
}

/// Append the row-per-line output format to a read statement
fn select_statement(sql: &str) -> String {
    let sql = sql.trim().trim_end_matches(';');
    format!("{} FORMAT JSONEachRow", sql)
}

/// Parse row-per-line response text
fn parse_rows(text: &str) -> Result<Vec<Row>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(ClusterError::from))
        .collect()
}

/// Build a bulk-insert statement for a homogeneous batch
fn insert_statement(table: &str, rows: &[Row]) -> Result<String> {
    let columns = rows[0].schema();
    let mut statement = format!(
        "INSERT INTO {} ({}) FORMAT JSONEachRow\n",
        table,
        columns.columns().join(", ")
    );
    for row in rows {
        statement.push_str(&serde_json::to_string(row)?);
        statement.push('\n');
    }
    Ok(statement)
}

#[async_trait]
impl NodeConnection for HttpNode {
    async fn select(&self, sql: &str) -> Result<Vec<Row>> {
        let text = self.send(select_statement(sql)).await?;
        parse_rows(&text)
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.send(sql.to_string()).await?;
        Ok(())
    }

    async fn bulk_insert(&self, table: &str, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.send(insert_statement(table, rows)?).await?;
        Ok(())
    }

    async fn truncate(&self, table: &str) -> Result<()> {
        self.execute(&format!("TRUNCATE TABLE {}", table)).await
    }

    async fn use_database(&self, database: &str) -> Result<()> {
        let previous = std::mem::replace(&mut *self.database.write(), database.to_string());
        // Probe so a bad database name surfaces here, not on the next
        // query; a failed switch must not poison the session.
        if let Err(e) = self.send("SELECT 1".to_string()).await {
            *self.database.write() = previous;
            return Err(e);
        }
        Ok(())
    }

    fn host(&self) -> &str {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_statement() {
        assert_eq!(
            select_statement("SELECT a FROM t;"),
            "SELECT a FROM t FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_parse_rows() {
        let rows = parse_rows("{\"a\":1}\n{\"a\":2}\n\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("a"), Some(&json!(2)));
    }

    #[test]
    fn test_parse_rows_malformed() {
        let err = parse_rows("{\"a\":1}\nnot json\n").unwrap_err();
        assert_eq!(err.error_type(), "encoding");
    }

    #[tokio::test]
    async fn test_failed_database_switch_keeps_the_old_database() {
        let node = HttpNode {
            http: Client::builder()
                .connect_timeout(Duration::from_millis(200))
                .timeout(Duration::from_millis(500))
                .build()
                .unwrap(),
            // Discard port, nothing listens here
            base_url: "http://127.0.0.1:9/".to_string(),
            host: "127.0.0.1".to_string(),
            login: "default".to_string(),
            password: None,
            database: RwLock::new("default".to_string()),
        };

        node.use_database("missing").await.unwrap_err();
        assert_eq!(*node.database.read(), "default");
    }

    #[test]
    fn test_insert_statement() {
        let rows = vec![
            Row::new().with("a", json!(1)).with("b", json!("x")),
            Row::new().with("a", json!(2)).with("b", json!("y")),
        ];
        let statement = insert_statement("events", &rows).unwrap();
        assert_eq!(
            statement,
            "INSERT INTO events (a, b) FORMAT JSONEachRow\n{\"a\":1,\"b\":\"x\"}\n{\"a\":2,\"b\":\"y\"}\n"
        );
    }
}
