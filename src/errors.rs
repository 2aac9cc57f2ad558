//! Error handling for the metrics agent
//!
//! Plain failures are `TylError` values built through the semantic
//! constructors below. Query execution adds one more distinction on top:
//! whether the failure ends the run ([`QueryFailure::Fatal`]) or only the
//! current collector ([`QueryFailure::Recoverable`]).

use super::*;
use std::fmt;

/// Create a validation error for an operator-supplied value
///
/// # Example
/// ```rust
/// use oracle_metrics_agent::agent_validation_error;
///
/// let error = agent_validation_error("context", "Metric context cannot be empty");
/// assert!(error.to_string().contains("cannot be empty"));
/// ```
pub fn agent_validation_error(field: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::validation(field.into(), message.into())
}

/// Create a configuration error
///
/// Used for missing settings, unreadable files and parse failures.
pub fn agent_config_error(config_key: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::configuration(format!(
        "Config error for {}: {}",
        config_key.into(),
        message.into()
    ))
}

/// Create a connection error
///
/// Used when the database cannot be reached or the session was lost.
pub fn agent_connection_error(dsn: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::network(format!(
        "Connection error to {}: {}",
        dsn.into(),
        message.into()
    ))
}

/// Create a query error for a single collector
pub fn agent_query_error(collector: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::internal(format!(
        "Query error in {}: {}",
        collector.into(),
        message.into()
    ))
}

/// Create an output stream error
pub fn agent_output_error(stream: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::internal(format!(
        "Output error on {}: {}",
        stream.into(),
        message.into()
    ))
}

pub fn from_io_error(stream: &str, error: std::io::Error) -> TylError {
    agent_output_error(stream, error.to_string())
}

pub fn from_serde_yaml_error(path: &str, error: serde_yaml::Error) -> TylError {
    agent_config_error(path, error.to_string())
}

pub fn from_serde_json_error(path: &str, error: serde_json::Error) -> TylError {
    agent_config_error(path, error.to_string())
}

/// Outcome of a failed query, split by blast radius
///
/// `Fatal` ends the run (the connection is gone); `Recoverable` is reported
/// and the next collector proceeds.
#[derive(Debug)]
pub enum QueryFailure {
    /// The executor can no longer serve queries
    Fatal(TylError),

    /// Only this query failed (bad SQL, missing object, privileges)
    Recoverable(TylError),
}

/// Result type returned by executor queries
pub type QueryResult<T> = std::result::Result<T, QueryFailure>;

impl QueryFailure {
    /// The connection to `dsn` was lost
    pub fn connection_lost(dsn: impl Into<String>, message: impl Into<String>) -> Self {
        QueryFailure::Fatal(agent_connection_error(dsn, message))
    }

    /// A statement failed without affecting the session
    pub fn statement(message: impl Into<String>) -> Self {
        QueryFailure::Recoverable(TylError::internal(format!(
            "Statement failed: {}",
            message.into()
        )))
    }

    /// Whether the failure must end the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, QueryFailure::Fatal(_))
    }

    /// Unwrap the underlying error
    pub fn into_error(self) -> TylError {
        match self {
            QueryFailure::Fatal(error) | QueryFailure::Recoverable(error) => error,
        }
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFailure::Fatal(error) | QueryFailure::Recoverable(error) => write!(f, "{error}"),
        }
    }
}

/// Helper trait for naming the collector an error came from
pub trait AgentErrorExt {
    /// Wrap the error with the collector (fixed emitter or dynamic context) name
    fn with_collector(self, collector: impl Into<String>) -> TylError;
}

impl AgentErrorExt for TylError {
    fn with_collector(self, collector: impl Into<String>) -> TylError {
        TylError::internal(format!("Collector [{}]: {}", collector.into(), self))
    }
}
