//! One collection run
//!
//! A run executes the built-in metrics, then the dynamic blocks, flushes
//! the metric stream and closes the executor. The executor is closed on
//! every path, including a fatal error halfway through.

use super::*;
use std::io::Write;
use tracing::{info, warn};

/// What a completed run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Metric lines written
    pub lines: usize,

    /// Collectors that failed and were skipped
    pub failures: Vec<CollectorFailure>,
}

impl RunSummary {
    /// Whether every collector succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs every collector once against a connected executor
pub struct MetricsAgent<'a, E: QueryExecutor> {
    executor: &'a E,
    config: &'a AgentConfig,
    instance: InstanceId,
}

impl<'a, E: QueryExecutor> MetricsAgent<'a, E> {
    /// Create an agent for one run
    pub fn new(executor: &'a E, config: &'a AgentConfig, instance: InstanceId) -> Self {
        Self {
            executor,
            config,
            instance,
        }
    }

    /// The instance identifier attached to every line
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// Run fixed metrics (if enabled) then dynamic blocks
    ///
    /// Does not close the executor; see [`run_once`].
    pub async fn run<O: Write, W: Write>(
        &self,
        output: &mut MetricOutput<O, W>,
    ) -> Result<RunSummary> {
        let mut failures = Vec::new();

        if self.config.fixed_metrics {
            let fixed = FixedMetricEmitter::new(self.executor, &self.instance);
            failures.extend(fixed.run(output).await?);
        }

        let runner = DynamicMetricRunner::new(self.executor, &self.instance);
        failures.extend(runner.run(&self.config.metrics, output).await?);

        output.flush()?;

        Ok(RunSummary {
            lines: output.lines_written(),
            failures,
        })
    }
}

/// Run once and close the executor, whatever happened
///
/// # Returns
/// * `Result<RunSummary>` - The summary, or the fatal error that ended the run
///
/// # Example
/// ```rust
/// use oracle_metrics_agent::{
///     run_once, AgentConfig, MetricOutput, MockExecutorConfig, MockQueryExecutor, ResultRow,
/// };
///
/// # tokio_test::block_on(async {
/// let executor = MockQueryExecutor::new(
///     MockExecutorConfig::new()
///         .with_rows("v$instance", vec![ResultRow::new(vec!["OPEN".into(), 1.into()])]),
/// );
/// let mut config = AgentConfig::default();
/// config.instance = Some("T1".to_string());
/// let mut output = MetricOutput::new(Vec::new(), Vec::new());
///
/// let summary = run_once(&executor, &config, &mut output).await.unwrap();
/// assert_eq!(summary.lines, 2);
/// assert!(executor.is_closed().await);
/// # });
/// ```
pub async fn run_once<E, O, W>(
    executor: &E,
    config: &AgentConfig,
    output: &mut MetricOutput<O, W>,
) -> Result<RunSummary>
where
    E: QueryExecutor,
    O: Write,
    W: Write,
{
    let result = match config.instance_id() {
        Ok(instance) => {
            info!(instance = %instance, blocks = config.metrics.len(), "starting collection run");
            MetricsAgent::new(executor, config, instance).run(output).await
        }
        Err(error) => Err(error),
    };

    if let Err(error) = executor.close().await {
        warn!(error = %error, "closing the executor failed");
    }

    if let Ok(summary) = &result {
        info!(
            lines = summary.lines,
            failures = summary.failures.len(),
            "collection run finished"
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockExecutorConfig, MockFailure, MockQueryExecutor};

    fn row(cells: Vec<Scalar>) -> ResultRow {
        ResultRow::new(cells)
    }

    fn config_with(metrics: Vec<MetricBlock>) -> AgentConfig {
        AgentConfig {
            instance: Some("T1".to_string()),
            metrics,
            ..AgentConfig::default()
        }
    }

    fn split(output: MetricOutput<Vec<u8>, Vec<u8>>) -> (String, String) {
        let (out, err) = output.into_inner();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[tokio::test]
    async fn test_fixed_then_dynamic_order() {
        let executor = MockQueryExecutor::new(
            MockExecutorConfig::new()
                .with_rows("v$waitclassmetric", vec![row(vec!["User I/O".into(), 0.123.into()])])
                .with_rows("custom_view", vec![row(vec!["x".into(), 1.into()])]),
        );
        let config = config_with(vec![MetricBlock::new("custom", "SELECT k, v FROM custom_view")]);
        let mut output = MetricOutput::new(Vec::new(), Vec::new());

        let summary = run_once(&executor, &config, &mut output).await.unwrap();

        assert!(summary.is_clean());
        let queries = executor.executed_queries().await;
        assert_eq!(queries.len(), FIXED_METRICS.len() + 1);
        assert!(queries.last().unwrap().contains("custom_view"));

        let (out, _) = split(output);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), summary.lines);
        assert!(lines[0].starts_with("oracle_wait_class,instance=T1"));
        assert_eq!(*lines.last().unwrap(), "oracle_custom,instance=T1,c1=x value=1");
    }

    #[tokio::test]
    async fn test_fixed_metrics_can_be_disabled() {
        let executor = MockQueryExecutor::new(MockExecutorConfig::new());
        let config = AgentConfig {
            fixed_metrics: false,
            ..config_with(vec![MetricBlock::new("only", "SELECT 1 FROM dual")])
        };
        let mut output = MetricOutput::new(Vec::new(), Vec::new());

        run_once(&executor, &config, &mut output).await.unwrap();

        assert_eq!(executor.executed_queries().await, vec!["SELECT 1 FROM dual"]);
    }

    #[tokio::test]
    async fn test_recoverable_failures_are_summarized() {
        let executor = MockQueryExecutor::new(
            MockExecutorConfig::new()
                .with_failure("v$sysmetric", MockFailure::Statement("ORA-01031: insufficient privileges".to_string()))
                .with_failure("bad_view", MockFailure::Statement("ORA-00942: table or view does not exist".to_string())),
        );
        let config = config_with(vec![
            MetricBlock::new("bad", "SELECT * FROM bad_view"),
            MetricBlock::new("good", "SELECT 1 FROM dual"),
        ]);
        let mut output = MetricOutput::new(Vec::new(), Vec::new());

        let summary = run_once(&executor, &config, &mut output).await.unwrap();

        let collectors: Vec<&str> = summary.failures.iter().map(|f| f.collector.as_str()).collect();
        assert_eq!(collectors, vec!["sysmetric", "bad"]);
        assert!(!summary.is_clean());

        let (_, err) = split(output);
        assert_eq!(err.lines().count(), 2);
        assert!(err.lines().all(|l| l.starts_with("ERROR|")));
    }

    #[tokio::test]
    async fn test_fatal_error_still_closes_executor() {
        let executor = MockQueryExecutor::new(MockExecutorConfig::new().with_failure(
            "v$waitclassmetric",
            MockFailure::ConnectionLost("ORA-03113: end-of-file on communication channel".to_string()),
        ));
        let config = config_with(vec![MetricBlock::new("never", "SELECT 1 FROM dual")]);
        let mut output = MetricOutput::new(Vec::new(), Vec::new());

        let error = run_once(&executor, &config, &mut output).await.unwrap_err();

        assert!(error.to_string().contains("ORA-03113"));
        assert_eq!(executor.executed_queries().await.len(), 1);
        assert_eq!(executor.close_count().await, 1);
    }

    #[tokio::test]
    async fn test_underivable_instance_closes_executor() {
        let executor = MockQueryExecutor::new(MockExecutorConfig::new());
        let mut config = AgentConfig::default();
        config.connection.dsn = "(DESCRIPTION=(ADDRESS=(HOST=db01)))".to_string();
        let mut output = MetricOutput::new(Vec::new(), Vec::new());

        assert!(run_once(&executor, &config, &mut output).await.is_err());
        assert!(executor.executed_queries().await.is_empty());
        assert!(executor.is_closed().await);
    }

    #[tokio::test]
    async fn test_agent_instance_accessor() {
        let executor = MockQueryExecutor::new(MockExecutorConfig::new());
        let config = config_with(Vec::new());
        let agent = MetricsAgent::new(&executor, &config, InstanceId::new("T 1"));
        assert_eq!(agent.instance().as_str(), "T_1");
    }
}
