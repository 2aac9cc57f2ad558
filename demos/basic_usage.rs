//! Basic usage example for the Oracle metrics agent
//!
//! Runs one collection against the in-memory mock executor, so it needs no
//! database. The mock answers each query from fixtures keyed by SQL
//! fragments; here it serves a few built-in diagnostics plus one dynamic
//! metric, and one scripted failure shows the `ERROR|` channel.

use oracle_metrics_agent::{
    run_once, AgentConfig, MetricBlock, MetricOutput, MockExecutorConfig, MockFailure,
    MockQueryExecutor, ResultRow, Scalar,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fixtures = MockExecutorConfig::new()
        .with_rows(
            "v$waitclassmetric",
            vec![ResultRow::new(vec!["User I/O".into(), 0.123.into()])],
        )
        .with_rows(
            "v$instance",
            vec![
                ResultRow::new(vec!["OPEN".into(), 1.into()]),
                ResultRow::new(vec!["ACTIVE".into(), 1.into()]),
            ],
        )
        .with_rows(
            "GROUP BY machine",
            vec![
                ResultRow::new(vec!["app server 1".into(), 12.into()]),
                ResultRow::new(vec![Scalar::Null, 3.into()]),
            ],
        )
        .with_failure(
            "dba_tablespace_usage_metrics",
            MockFailure::Statement("ORA-01031: insufficient privileges".to_string()),
        );
    let executor = MockQueryExecutor::new(fixtures);

    let mut config = AgentConfig::default();
    config.instance = Some("DEMO".to_string());
    config.metrics.push(
        MetricBlock::new(
            "sessions_by_machine",
            "SELECT machine, COUNT(*) FROM v$session GROUP BY machine",
        )
        .with_tag_field("machine"),
    );

    // Metric lines on stdout, ERROR| lines on stderr
    let mut output = MetricOutput::stdio();
    let summary = run_once(&executor, &config, &mut output).await?;

    eprintln!(
        "{} lines written, {} collectors skipped, {} queries executed",
        summary.lines,
        summary.failures.len(),
        executor.executed_queries().await.len()
    );

    Ok(())
}
