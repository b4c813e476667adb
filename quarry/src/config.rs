//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::buffer::FlushThresholds;

/// A single physical cluster endpoint.
///
/// Immutable configuration; one node connection is built from each at
/// startup. Endpoints that fail to connect are dropped from the pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeEndpoint {
    pub host: String,
    pub port: u16,

    /// Login for the database user
    #[serde(default = "default_login")]
    pub login: String,

    /// Password, if the node requires one
    #[serde(default)]
    pub password: Option<String>,

    /// Database selected for the session
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_login() -> String {
    "default".to_string()
}

fn default_database() -> String {
    "default".to_string()
}

impl NodeEndpoint {
    /// Create an endpoint with default credentials and database
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            login: default_login(),
            password: None,
            database: default_database(),
        }
    }

    /// Set login and password
    pub fn with_credentials(mut self, login: impl Into<String>, password: Option<String>) -> Self {
        self.login = login.into();
        self.password = password;
        self
    }

    /// Set the session database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Base URL of the node's HTTP interface
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

/// Connection settings for the shared buffer store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BufferStoreConfig {
    pub host: String,
    pub port: u16,

    #[serde(default)]
    pub password: Option<String>,
}

impl BufferStoreConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Connection URL for the store driver
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/", password, self.host, self.port),
            None => format!("redis://{}:{}/", self.host, self.port),
        }
    }
}

/// Tunable client behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Buffered row count above which the next insert flushes the table
    #[serde(default = "default_max_buffered_rows")]
    pub max_buffered_rows: u64,

    /// Buffer age in seconds above which the next insert flushes the table
    #[serde(default = "default_max_buffered_age")]
    pub max_buffered_age_secs: u64,

    /// Pause between failed node attempts in the failover loop
    #[serde(default = "default_failover_backoff")]
    pub failover_backoff_ms: u64,

    /// Per-node connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Namespace prefix for buffer store keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Local file receiving best-effort diagnostic lines
    #[serde(default = "default_diagnostic_path")]
    pub diagnostic_path: PathBuf,
}

fn default_max_buffered_rows() -> u64 {
    20_000
}

fn default_max_buffered_age() -> u64 {
    60
}

fn default_failover_backoff() -> u64 {
    1000
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_key_prefix() -> String {
    "quarry:buffer:".to_string()
}

fn default_diagnostic_path() -> PathBuf {
    PathBuf::from("/tmp/quarry_cluster_debug")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_buffered_rows: default_max_buffered_rows(),
            max_buffered_age_secs: default_max_buffered_age(),
            failover_backoff_ms: default_failover_backoff(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            key_prefix: default_key_prefix(),
            diagnostic_path: default_diagnostic_path(),
        }
    }
}

impl ClientConfig {
    /// Get the failover backoff as Duration
    pub fn failover_backoff(&self) -> Duration {
        Duration::from_millis(self.failover_backoff_ms)
    }

    /// Get the connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get the request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Flush thresholds derived from this configuration
    pub fn thresholds(&self) -> FlushThresholds {
        FlushThresholds {
            max_rows: self.max_buffered_rows,
            max_age: Duration::from_secs(self.max_buffered_age_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.max_buffered_rows, 20_000);
        assert_eq!(config.max_buffered_age_secs, 60);
        assert_eq!(config.failover_backoff(), Duration::from_millis(1000));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig = serde_json::from_str(r#"{"max_buffered_rows": 5}"#).unwrap();
        assert_eq!(config.max_buffered_rows, 5);
        assert_eq!(config.max_buffered_age_secs, 60);
    }

    #[test]
    fn test_store_url() {
        let config = BufferStoreConfig::new("10.0.0.5", 6379);
        assert_eq!(config.url(), "redis://10.0.0.5:6379/");

        let config = config.with_password("hunter2");
        assert_eq!(config.url(), "redis://:hunter2@10.0.0.5:6379/");
    }

    #[test]
    fn test_node_endpoint_url() {
        let endpoint = NodeEndpoint::new("ch-1.internal", 8123);
        assert_eq!(endpoint.url(), "http://ch-1.internal:8123/");
        assert_eq!(endpoint.login, "default");
        assert_eq!(endpoint.database, "default");
    }
}
