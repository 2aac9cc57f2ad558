//! Query execution port
//!
//! This module defines the contract between the metric collectors and the
//! database driver. Collectors only submit SQL text and receive ordered
//! rows; connecting, cursor handling and type mapping belong to adapters.

use super::*;
use async_trait::async_trait;

/// **Primary Port Interface** for query execution
///
/// One executor wraps one live connection, used serially: a query returns
/// only after its cursor has been released.
///
/// ## Example Implementation
/// ```rust
/// use oracle_metrics_agent::{async_trait, HealthStatus, QueryExecutor, QueryResult, Result, ResultRow};
///
/// pub struct DualExecutor;
///
/// #[async_trait]
/// impl QueryExecutor for DualExecutor {
///     type Config = ();
///
///     async fn connect(_config: Self::Config) -> Result<Self> {
///         Ok(Self)
///     }
///
///     async fn query(&self, _sql: &str) -> QueryResult<Vec<ResultRow>> {
///         Ok(vec![ResultRow::new(vec![1.into()])])
///     }
///
///     async fn health_check(&self) -> Result<HealthStatus> {
///         Ok(HealthStatus::healthy())
///     }
///
///     async fn close(&self) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Connection settings specific to this adapter
    type Config: Send + Sync;

    /// Establish the connection
    ///
    /// Failure here is always fatal for the run.
    async fn connect(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Execute one statement and fetch every row in server order
    ///
    /// # Returns
    /// * `QueryResult<Vec<ResultRow>>` - The rows, or a failure tagged fatal
    ///   when the connection itself is gone
    async fn query(&self, sql: &str) -> QueryResult<Vec<ResultRow>>;

    /// Check that the connection is usable
    async fn health_check(&self) -> Result<HealthStatus>;

    /// Release the connection
    ///
    /// Called exactly once on every exit path after a successful `connect`.
    async fn close(&self) -> Result<()>;
}

/// Health status information for executors
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    /// Whether the connection is usable
    pub is_healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Optional additional metadata (server version, dsn, ...)
    pub metadata: std::collections::HashMap<String, String>,
}

impl HealthStatus {
    /// Create a healthy status
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            message: "Connection is healthy".to_string(),
            metadata: std::collections::HashMap::new(),
        }
    }

    /// Create an unhealthy status with a message
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            is_healthy: false,
            message: message.into(),
            metadata: std::collections::HashMap::new(),
        }
    }

    /// Add metadata to the health status
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::healthy()
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.is_healthy { "HEALTHY" } else { "UNHEALTHY" };
        write!(f, "[{}] {}", status, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_healthy() {
        let status = HealthStatus::healthy();
        assert!(status.is_healthy);
        assert!(status.message.contains("healthy"));
    }

    #[test]
    fn test_health_status_unhealthy() {
        let status = HealthStatus::unhealthy("ORA-03113");
        assert!(!status.is_healthy);
        assert_eq!(status.message, "ORA-03113");
    }

    #[test]
    fn test_health_status_with_metadata() {
        let status = HealthStatus::healthy()
            .with_metadata("server_version", "19.0.0.0.0")
            .with_metadata("dsn", "db01:1521/ORCL");

        assert_eq!(
            status.metadata.get("server_version"),
            Some(&"19.0.0.0.0".to_string())
        );
        assert_eq!(status.metadata.get("dsn"), Some(&"db01:1521/ORCL".to_string()));
    }

    #[test]
    fn test_health_status_display() {
        assert!(HealthStatus::healthy().to_string().contains("[HEALTHY]"));

        let unhealthy = HealthStatus::unhealthy("Not connected");
        assert!(unhealthy.to_string().contains("[UNHEALTHY]"));
        assert!(unhealthy.to_string().contains("Not connected"));
    }
}
