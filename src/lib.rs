//! # Oracle Metrics Agent
//!
//! One-shot Oracle diagnostics collector speaking InfluxDB line protocol.
//!
//! A run connects to one database, executes the built-in diagnostic
//! queries and any operator-declared dynamic queries, writes one line per
//! result row to stdout and exits. Collection is scheduled externally,
//! typically by a telemetry agent's exec input.
//!
//! - **Port Interface**: [`QueryExecutor`], implemented by [`OracleExecutor`]
//!   and by [`MockQueryExecutor`] for tests
//! - **Collectors**: [`FixedMetricEmitter`] and [`DynamicMetricRunner`]
//! - **Output**: [`MetricLine`] rendering and the `ERROR|` error channel
//!
//! ## Quick Start
//!
//! ```rust
//! use oracle_metrics_agent::{
//!     run_once, AgentConfig, MetricBlock, MetricOutput, MockExecutorConfig, MockQueryExecutor,
//!     ResultRow,
//! };
//!
//! # tokio_test::block_on(async {
//! let executor = MockQueryExecutor::new(MockExecutorConfig::new().with_rows(
//!     "dba_data_files",
//!     vec![ResultRow::new(vec!["USERS".into(), 3.into()])],
//! ));
//!
//! let mut config = AgentConfig::default();
//! config.instance = Some("ORCL".to_string());
//! config.fixed_metrics = false;
//! config.metrics.push(
//!     MetricBlock::new("datafiles", "SELECT tablespace_name, COUNT(*) FROM dba_data_files")
//!         .with_tag_field("tbs"),
//! );
//!
//! let mut output = MetricOutput::new(Vec::new(), Vec::new());
//! run_once(&executor, &config, &mut output).await.unwrap();
//!
//! let (out, _) = output.into_inner();
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "oracle_datafiles,instance=ORCL,tbs=USERS value=3\n"
//! );
//! # });
//! ```

pub use tyl_errors::{TylError, TylResult};

// Core port interface
mod port;
pub use port::{HealthStatus, QueryExecutor};

// Domain types
mod types;
pub use types::{InstanceId, MetricBlock, ResultRow, Scalar};

// Error helpers for the agent domain
mod errors;
pub use errors::{
    agent_config_error, agent_connection_error, agent_output_error, agent_query_error,
    agent_validation_error, from_io_error, from_serde_json_error, from_serde_yaml_error,
    AgentErrorExt, QueryFailure, QueryResult,
};

// Tag sanitizing and block validation
mod utils;
pub use utils::{
    sanitize_tag, single_line, validate_block, validate_context, validate_instance,
    validate_tag_field,
};

// Row classification and line rendering
mod classify;
pub use classify::{classify_row, Classified};

mod line;
pub use line::{format_line, MetricLine};

mod output;
pub use output::{MetricOutput, ERROR_PREFIX};

// Collectors
mod runner;
pub use runner::{BlockOutcome, CollectorFailure, DynamicMetricRunner};

mod fixed;
pub use fixed::{status_count, FixedMetric, FixedMetricEmitter, MappedRows, RowLayout, FIXED_METRICS};

mod agent;
pub use agent::{run_once, MetricsAgent, RunSummary};

// Configuration
mod config;
pub use config::{derive_instance_name, AgentConfig, ConfigOverrides, ConnectionConfig};

// Mock executor for tests and examples
mod mock;
pub use mock::{MockExecutorConfig, MockFailure, MockQueryExecutor};

// Oracle driver adapter
#[cfg(feature = "oracle")]
mod adapter;
#[cfg(feature = "oracle")]
pub use adapter::{is_connection_lost, number_scalar, OracleExecutor};

/// Result type for agent operations using TYL error handling
pub type Result<T> = TylResult<T>;

/// Re-export async_trait for adapter implementations
pub use async_trait::async_trait;
