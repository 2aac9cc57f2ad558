//! Oracle adapter for the query execution port
//!
//! Wraps one `oracle::Connection`. The driver is blocking, so every call
//! runs on tokio's blocking pool while holding the connection mutex; a
//! query's result set is fully fetched and dropped before the lock is
//! released, so cursors never outlive the call.

use super::*;
use oracle::sql_type::OracleType;
use oracle::{Connection, SqlValue};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Driver error codes meaning the session is gone
const CONNECTION_LOST_CODES: [&str; 6] = [
    "ORA-03113", // end-of-file on communication channel
    "ORA-03114", // not connected to ORACLE
    "ORA-03135", // connection lost contact
    "ORA-12537", // TNS:connection closed
    "DPI-1010",  // not connected
    "DPI-1080",  // connection was closed
];

/// Query executor backed by a live Oracle connection
pub struct OracleExecutor {
    connection: Arc<Mutex<Connection>>,
    dsn: String,
}

impl OracleExecutor {
    /// The connect string this executor was opened with
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    async fn with_connection<T, F>(&self, call: F) -> std::result::Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> std::result::Result<T, String> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection
                .lock()
                .map_err(|_| "DPI-1010: connection mutex poisoned".to_string())?;
            call(&guard)
        })
        .await
        .map_err(|e| format!("DPI-1010: driver call aborted: {e}"))?
    }
}

#[async_trait]
impl QueryExecutor for OracleExecutor {
    type Config = ConnectionConfig;

    async fn connect(config: Self::Config) -> Result<Self> {
        let dsn = config.dsn.clone();
        debug!(user = %config.user, dsn = %dsn, "connecting");

        let connection = tokio::task::spawn_blocking(move || {
            Connection::connect(&config.user, &config.password, &config.dsn)
        })
        .await
        .map_err(|e| agent_connection_error(dsn.as_str(), e.to_string()))?
        .map_err(|e| agent_connection_error(dsn.as_str(), e.to_string()))?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            dsn,
        })
    }

    async fn query(&self, sql: &str) -> QueryResult<Vec<ResultRow>> {
        let sql = sql.to_string();

        self.with_connection(move |conn| fetch_rows(conn, &sql).map_err(|e| e.to_string()))
            .await
            .map_err(|message| classify_failure(&self.dsn, message))
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        let probe = self
            .with_connection(|conn| {
                conn.ping().map_err(|e| e.to_string())?;
                let (version, _banner) = conn.server_version().map_err(|e| e.to_string())?;
                Ok(version.to_string())
            })
            .await;

        Ok(match probe {
            Ok(version) => HealthStatus::healthy()
                .with_metadata("server_version", version)
                .with_metadata("dsn", self.dsn.as_str()),
            Err(message) => HealthStatus::unhealthy(message),
        })
    }

    async fn close(&self) -> Result<()> {
        debug!(dsn = %self.dsn, "closing connection");
        self.with_connection(|conn| conn.close().map_err(|e| e.to_string()))
            .await
            .map_err(|message| agent_connection_error(self.dsn.as_str(), message))
    }
}

fn fetch_rows(conn: &Connection, sql: &str) -> oracle::Result<Vec<ResultRow>> {
    let result_set = conn.query(sql, &[])?;
    let column_types: Vec<OracleType> = result_set
        .column_info()
        .iter()
        .map(|info| info.oracle_type().clone())
        .collect();

    let mut rows = Vec::new();
    for row in result_set {
        let row = row?;
        let cells = row
            .sql_values()
            .iter()
            .zip(&column_types)
            .map(|(value, oracle_type)| to_scalar(value, oracle_type))
            .collect::<oracle::Result<Vec<Scalar>>>()?;
        rows.push(ResultRow::new(cells));
    }

    Ok(rows)
}

fn to_scalar(value: &SqlValue, oracle_type: &OracleType) -> oracle::Result<Scalar> {
    if value.is_null()? {
        return Ok(Scalar::Null);
    }

    Ok(match oracle_type {
        OracleType::Number(_, _) | OracleType::Float(_) => number_scalar(&value.get::<String>()?),
        OracleType::BinaryFloat | OracleType::BinaryDouble => Scalar::Float(value.get::<f64>()?),
        OracleType::Int64 => Scalar::Integer(value.get::<i64>()?),
        _ => Scalar::Text(value.get::<String>()?),
    })
}

/// Map the driver's text form of an Oracle NUMBER onto a scalar
///
/// Integral values become `Integer`, everything else `Float`; text that is
/// neither stays `Text`.
pub fn number_scalar(text: &str) -> Scalar {
    let text = text.trim();
    if let Ok(integer) = text.parse::<i64>() {
        return Scalar::Integer(integer);
    }
    match text.parse::<f64>() {
        Ok(float) => Scalar::Float(float),
        Err(_) => Scalar::Text(text.to_string()),
    }
}

/// Whether a driver message means the session is gone
pub fn is_connection_lost(message: &str) -> bool {
    CONNECTION_LOST_CODES.iter().any(|code| message.contains(code))
}

fn classify_failure(dsn: &str, message: String) -> QueryFailure {
    if is_connection_lost(&message) {
        QueryFailure::connection_lost(dsn, message)
    } else {
        QueryFailure::statement(message)
    }
}
