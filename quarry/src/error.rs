//! Cluster client error types

use thiserror::Error;

/// Errors that can occur during cluster operations
#[derive(Error, Debug)]
pub enum ClusterError {
    /// A single node's operation failed. Recoverable: the failover loop
    /// retries the next node.
    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    /// Every configured node failed for this operation. Fatal to the caller.
    #[error("cluster unavailable: {0}")]
    ClusterUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed row data that cannot be serialized or grouped by schema.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Buffer store fault. Not retried: a failing store is assumed to
    /// indicate a broader outage.
    #[error("buffer store error: {0}")]
    Buffer(String),

    /// Underlying database driver fault (connect, request, transfer).
    #[error("driver error: {0}")]
    Driver(String),
}

impl ClusterError {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            ClusterError::NodeUnavailable(_) => "node_unavailable",
            ClusterError::ClusterUnavailable(_) => "cluster_unavailable",
            ClusterError::Config(_) => "config",
            ClusterError::Encoding(_) => "encoding",
            ClusterError::Buffer(_) => "buffer",
            ClusterError::Driver(_) => "driver",
        }
    }
}

impl From<redis::RedisError> for ClusterError {
    fn from(err: redis::RedisError) -> Self {
        ClusterError::Buffer(err.to_string())
    }
}

impl From<reqwest::Error> for ClusterError {
    fn from(err: reqwest::Error) -> Self {
        ClusterError::Driver(err.to_string())
    }
}

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        ClusterError::Encoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
