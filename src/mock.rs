//! Mock query executor for testing and dry runs
//!
//! Serves canned rows keyed by SQL fragments: the first fixture whose
//! fragment occurs in the submitted SQL answers it, and unmatched SQL returns
//! no rows. Failures can be scripted per fragment to exercise both the
//! recoverable and the fatal paths.

use super::*;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Scripted failure for a SQL fragment
#[derive(Debug, Clone, PartialEq)]
pub enum MockFailure {
    /// Statement error; the session stays usable
    Statement(String),

    /// Connection loss; every later query fails too
    ConnectionLost(String),
}

/// Configuration for the mock executor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MockExecutorConfig {
    /// Fragment-to-rows fixtures, matched in insertion order
    pub fixtures: Vec<(String, Vec<ResultRow>)>,

    /// Fragment-to-failure scripts, checked before fixtures
    pub failures: Vec<(String, MockFailure)>,

    /// Whether `connect` itself should fail
    pub refuse_connection: bool,
}

impl MockExecutorConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer SQL containing `fragment` with `rows`
    pub fn with_rows(mut self, fragment: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        self.fixtures.push((fragment.into(), rows));
        self
    }

    /// Fail SQL containing `fragment`
    pub fn with_failure(mut self, fragment: impl Into<String>, failure: MockFailure) -> Self {
        self.failures.push((fragment.into(), failure));
        self
    }

    /// Make `connect` fail
    pub fn refusing_connection(mut self) -> Self {
        self.refuse_connection = true;
        self
    }
}

/// Mock executor that answers from in-memory fixtures
///
/// ## Example Usage
/// ```rust
/// use oracle_metrics_agent::{MockExecutorConfig, MockQueryExecutor, QueryExecutor, ResultRow};
///
/// # tokio_test::block_on(async {
/// let config = MockExecutorConfig::new()
///     .with_rows("v$instance", vec![ResultRow::new(vec!["OPEN".into(), 1.into()])]);
/// let executor = MockQueryExecutor::new(config);
///
/// let rows = executor.query("SELECT status, COUNT(*) FROM v$instance GROUP BY status").await.unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(executor.executed_queries().await.len(), 1);
/// # });
/// ```
pub struct MockQueryExecutor {
    /// Configuration for this executor
    config: MockExecutorConfig,

    /// Every SQL text submitted, in order
    executed: Arc<RwLock<Vec<String>>>,

    /// Set once a scripted connection loss fired
    lost: Arc<RwLock<bool>>,

    /// Number of `close` calls
    closed: Arc<RwLock<usize>>,
}

impl MockQueryExecutor {
    /// Create a connected mock executor
    ///
    /// This constructor skips `refuse_connection`; use
    /// [`QueryExecutor::connect`] to exercise connection failures.
    pub fn new(config: MockExecutorConfig) -> Self {
        Self {
            config,
            executed: Arc::new(RwLock::new(Vec::new())),
            lost: Arc::new(RwLock::new(false)),
            closed: Arc::new(RwLock::new(0)),
        }
    }

    /// All SQL submitted so far
    pub async fn executed_queries(&self) -> Vec<String> {
        self.executed.read().await.clone()
    }

    /// How many times `close` was called
    pub async fn close_count(&self) -> usize {
        *self.closed.read().await
    }

    /// Whether `close` was called at least once
    pub async fn is_closed(&self) -> bool {
        self.close_count().await > 0
    }

    /// Get current configuration
    pub fn config(&self) -> &MockExecutorConfig {
        &self.config
    }

    fn scripted_failure(&self, sql: &str) -> Option<&MockFailure> {
        self.config
            .failures
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, failure)| failure)
    }

    fn fixture_rows(&self, sql: &str) -> Vec<ResultRow> {
        self.config
            .fixtures
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryExecutor for MockQueryExecutor {
    type Config = MockExecutorConfig;

    async fn connect(config: Self::Config) -> Result<Self> {
        if config.refuse_connection {
            return Err(agent_connection_error(
                "mock",
                "Simulated connection refusal",
            ));
        }

        Ok(Self::new(config))
    }

    async fn query(&self, sql: &str) -> QueryResult<Vec<ResultRow>> {
        self.executed.write().await.push(sql.to_string());

        if *self.lost.read().await {
            return Err(QueryFailure::connection_lost("mock", "Not connected"));
        }

        match self.scripted_failure(sql) {
            Some(MockFailure::Statement(message)) => Err(QueryFailure::statement(message.clone())),
            Some(MockFailure::ConnectionLost(message)) => {
                *self.lost.write().await = true;
                Err(QueryFailure::connection_lost("mock", message.clone()))
            }
            None => Ok(self.fixture_rows(sql)),
        }
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if *self.lost.read().await {
            return Ok(HealthStatus::unhealthy("Not connected"));
        }

        Ok(HealthStatus::healthy().with_metadata("adapter", "mock"))
    }

    async fn close(&self) -> Result<()> {
        *self.closed.write().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_rows() -> Vec<ResultRow> {
        vec![
            ResultRow::new(vec!["OPEN".into(), 1.into()]),
            ResultRow::new(vec!["ACTIVE".into(), 1.into()]),
        ]
    }

    #[tokio::test]
    async fn test_fixture_matching_by_fragment() {
        let executor = MockQueryExecutor::new(
            MockExecutorConfig::new()
                .with_rows("v$instance", status_rows())
                .with_rows("V$SESSION", vec![ResultRow::new(vec!["ACTIVE".into(), 3.into()])]),
        );

        let rows = executor
            .query("SELECT status, COUNT(*) FROM v$instance GROUP BY status")
            .await
            .unwrap();
        assert_eq!(rows, status_rows());

        let sessions = executor
            .query("SELECT status, COUNT(*) FROM V$SESSION GROUP BY status")
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_first_matching_fixture_wins() {
        let executor = MockQueryExecutor::new(
            MockExecutorConfig::new()
                .with_rows("v$", vec![ResultRow::new(vec![1.into()])])
                .with_rows("v$instance", status_rows()),
        );

        let rows = executor.query("SELECT * FROM v$instance").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_sql_returns_no_rows() {
        let executor = MockQueryExecutor::new(MockExecutorConfig::new());
        let rows = executor.query("SELECT 1 FROM dual").await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(executor.executed_queries().await, vec!["SELECT 1 FROM dual"]);
    }

    #[tokio::test]
    async fn test_statement_failure_is_recoverable() {
        let executor = MockQueryExecutor::new(MockExecutorConfig::new().with_failure(
            "bogus_table",
            MockFailure::Statement("ORA-00942: table or view does not exist".to_string()),
        ));

        let failure = executor.query("SELECT * FROM bogus_table").await.unwrap_err();
        assert!(!failure.is_fatal());
        assert!(failure.to_string().contains("ORA-00942"));

        // Session still usable afterwards
        assert!(executor.query("SELECT 1 FROM dual").await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_loss_is_sticky_and_fatal() {
        let executor = MockQueryExecutor::new(MockExecutorConfig::new().with_failure(
            "v$sysmetric",
            MockFailure::ConnectionLost("ORA-03113: end-of-file on communication channel".to_string()),
        ));

        let failure = executor.query("SELECT * FROM v$sysmetric").await.unwrap_err();
        assert!(failure.is_fatal());

        let after = executor.query("SELECT 1 FROM dual").await.unwrap_err();
        assert!(after.is_fatal());

        let health = executor.health_check().await.unwrap();
        assert!(!health.is_healthy);
    }

    #[tokio::test]
    async fn test_connect_and_close() {
        let refused = MockQueryExecutor::connect(MockExecutorConfig::new().refusing_connection()).await;
        assert!(refused.is_err());

        let executor = MockQueryExecutor::connect(MockExecutorConfig::new()).await.unwrap();
        assert!(executor.health_check().await.unwrap().is_healthy);
        assert!(!executor.is_closed().await);

        executor.close().await.unwrap();
        assert_eq!(executor.close_count().await, 1);
        assert!(executor.config().fixtures.is_empty());
    }
}
