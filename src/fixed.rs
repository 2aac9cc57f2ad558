//! Built-in Oracle diagnostics
//!
//! Each fixed metric is a hardcoded query plus a column layout saying which
//! columns become tags and which become fields. The status metric is the odd
//! one out: it looks up the OPEN and ACTIVE rows instead of mapping every row.

use super::*;
use crate::runner::{isolate_failure, reject_row};
use std::io::Write;
use tracing::debug;

const WAIT_CLASS_SQL: &str = "
    SELECT n.wait_class,
           ROUND(m.time_waited/m.INTSIZE_CSEC,3) AAS
      FROM v$waitclassmetric m
      JOIN v$system_wait_class n
        ON m.wait_class_id = n.wait_class_id
     WHERE n.wait_class != 'Idle'";

const WAIT_EVENT_SQL: &str = "
    SELECT n.wait_class,
           n.name,
           m.wait_count,
           NVL(ROUND(10*m.time_waited/NULLIF(m.wait_count,0),3),0) avg_ms
      FROM v$eventmetric m
      JOIN v$event_name n
        ON m.event_id = n.event_id
     WHERE n.wait_class <> 'Idle'
       AND m.wait_count > 0
     ORDER BY 1";

const SYSMETRIC_SQL: &str = "
    SELECT METRIC_NAME, VALUE
      FROM v$sysmetric
     WHERE group_id = 2";

const TABLESPACE_SQL: &str = "
    SELECT tablespace_name,
           ROUND(used_space) used_mb,
           ROUND(max_size - used_space) free_mb,
           ROUND(max_size) max_mb,
           ROUND(used_space*100/max_size,2) pct_used
      FROM (
        SELECT m.tablespace_name,
               m.used_space * t.block_size/1024/1024 used_space,
               (CASE WHEN t.bigfile = 'YES'
                     THEN POWER(2,32)*t.block_size/1024/1024
                     ELSE tablespace_size*t.block_size/1024/1024
                END) max_size
          FROM dba_tablespace_usage_metrics m
          JOIN dba_tablespaces t
            ON m.tablespace_name = t.tablespace_name
      )";

const SESSION_SQL: &str = "SELECT status, COUNT(*) FROM V$SESSION GROUP BY status";

const INSTANCE_STATUS_SQL: &str = "SELECT status, COUNT(*) FROM v$instance GROUP BY status";

/// How a fixed metric maps its rows onto lines
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowLayout {
    /// One line per row; `(column, name)` pairs pick tags and fields
    Columns {
        tags: &'static [(usize, &'static str)],
        fields: &'static [(usize, &'static str)],
    },

    /// Two lines from a status/count result: OPEN and ACTIVE lookups
    StatusLookup,
}

impl RowLayout {
    /// Number of columns a row must have
    pub fn min_columns(&self) -> usize {
        match self {
            RowLayout::Columns { tags, fields } => tags
                .iter()
                .chain(fields.iter())
                .map(|(column, _)| column + 1)
                .max()
                .unwrap_or(0),
            RowLayout::StatusLookup => 2,
        }
    }
}

/// A built-in metric: name, query, measurement and row layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMetric {
    /// Collector name used in error reports
    pub name: &'static str,

    /// Measurement written on every line
    pub measurement: &'static str,

    /// Hardcoded SQL text
    pub query: &'static str,

    /// Row mapping
    pub layout: RowLayout,
}

/// The built-in metrics in emission order
pub const FIXED_METRICS: [FixedMetric; 6] = [
    FixedMetric {
        name: "wait_class",
        measurement: "oracle_wait_class",
        query: WAIT_CLASS_SQL,
        layout: RowLayout::Columns {
            tags: &[(0, "wait_class")],
            fields: &[(1, "wait_value")],
        },
    },
    FixedMetric {
        name: "wait_event",
        measurement: "oracle_wait_event",
        query: WAIT_EVENT_SQL,
        layout: RowLayout::Columns {
            tags: &[(1, "wait_event")],
            fields: &[(2, "count"), (3, "latency")],
        },
    },
    FixedMetric {
        name: "sysmetric",
        measurement: "oracle_sysmetric",
        query: SYSMETRIC_SQL,
        layout: RowLayout::Columns {
            tags: &[(0, "metric_name")],
            fields: &[(1, "metric_value")],
        },
    },
    FixedMetric {
        name: "tablespaces",
        measurement: "oracle_tablespaces",
        query: TABLESPACE_SQL,
        layout: RowLayout::Columns {
            tags: &[(0, "tbs_name")],
            fields: &[
                (1, "used_space_mb"),
                (2, "free_space_mb"),
                (4, "percent_used"),
                (3, "max_size_mb"),
            ],
        },
    },
    FixedMetric {
        name: "sessions",
        measurement: "oracle_connectioncount",
        query: SESSION_SQL,
        layout: RowLayout::Columns {
            tags: &[(0, "metric_name")],
            fields: &[(1, "metric_value")],
        },
    },
    FixedMetric {
        name: "status",
        measurement: "oracle_status",
        query: INSTANCE_STATUS_SQL,
        layout: RowLayout::StatusLookup,
    },
];

/// Lines mapped from one fixed metric's rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappedRows {
    /// Lines ready to be written, in row order
    pub lines: Vec<MetricLine>,

    /// 1-based numbers of rows whose fields were all NULL
    pub null_rows: Vec<usize>,
}

impl FixedMetric {
    /// Turn query rows into lines
    ///
    /// A row narrower than the layout needs is a recoverable failure of this
    /// metric; no line is produced for any of its rows. NULL tags and fields
    /// are left out of a line, and a row left without any field is listed in
    /// [`MappedRows::null_rows`] instead of becoming a line.
    pub fn lines(&self, rows: &[ResultRow], instance: &InstanceId) -> QueryResult<MappedRows> {
        let needed = self.layout.min_columns();
        if let Some(short) = rows.iter().find(|row| row.len() < needed) {
            return Err(QueryFailure::Recoverable(agent_query_error(
                self.name,
                format!("row has {} columns, expected {}", short.len(), needed),
            )));
        }

        let mut mapped = MappedRows::default();

        match self.layout {
            RowLayout::Columns { tags, fields } => {
                for (index, row) in rows.iter().enumerate() {
                    let line = MetricLine::new(self.measurement, instance).with_tags(
                        tags.iter()
                            .map(|&(column, name)| (name, cell(row, column)))
                            .filter(|(_, value)| !value.is_null()),
                    );
                    let line = fields.iter().fold(line, |line, &(column, name)| {
                        line.with_field(name, cell(row, column))
                    });

                    if line.has_fields() {
                        mapped.lines.push(line);
                    } else {
                        mapped.null_rows.push(index + 1);
                    }
                }
            }
            RowLayout::StatusLookup => {
                mapped.lines = vec![
                    MetricLine::new(self.measurement, instance)
                        .with_tag("metric_name", "instance_status")
                        .with_field("metric_value", status_count(rows, "OPEN")),
                    MetricLine::new(self.measurement, instance)
                        .with_tag("metric_name", "database_status")
                        .with_field("metric_value", status_count(rows, "ACTIVE")),
                ];
            }
        }

        Ok(mapped)
    }
}

fn cell(row: &ResultRow, column: usize) -> Scalar {
    row.get(column).cloned().unwrap_or(Scalar::Null)
}

/// Count from the first row whose status equals `status`, ignoring case
///
/// Defaults to `0` when no row matches or the count is NULL.
pub fn status_count(rows: &[ResultRow], status: &str) -> Scalar {
    rows.iter()
        .find(|row| {
            row.get(0)
                .map(|cell| cell.to_string().eq_ignore_ascii_case(status))
                .unwrap_or(false)
        })
        .map(|row| cell(row, 1))
        .filter(|count| !count.is_null())
        .unwrap_or(Scalar::Integer(0))
}

/// Runs the built-in metrics against one executor
pub struct FixedMetricEmitter<'a, E: QueryExecutor> {
    executor: &'a E,
    instance: &'a InstanceId,
}

impl<'a, E: QueryExecutor> FixedMetricEmitter<'a, E> {
    /// Create an emitter sharing the run's executor and instance identifier
    pub fn new(executor: &'a E, instance: &'a InstanceId) -> Self {
        Self { executor, instance }
    }

    /// Run every built-in metric in order, isolating failures
    pub async fn run<O: Write, W: Write>(
        &self,
        output: &mut MetricOutput<O, W>,
    ) -> Result<Vec<CollectorFailure>> {
        let mut failures = Vec::new();

        for metric in FIXED_METRICS.iter() {
            match self.run_metric(metric, output).await {
                Ok(rejected) => failures.extend(rejected),
                Err(failure) => failures.push(isolate_failure(metric.name, failure, output)?),
            }
        }

        Ok(failures)
    }

    /// Run one built-in metric, writing its lines on success
    ///
    /// # Returns
    /// * `QueryResult<Vec<CollectorFailure>>` - Rows reported as NULL and
    ///   skipped, or the failure of the whole metric
    pub async fn run_metric<O: Write, W: Write>(
        &self,
        metric: &FixedMetric,
        output: &mut MetricOutput<O, W>,
    ) -> QueryResult<Vec<CollectorFailure>> {
        debug!(metric = metric.name, "executing fixed metric query");

        let rows = self.executor.query(metric.query).await?;
        let mapped = metric.lines(&rows, self.instance)?;

        // A broken output stream ends the run like a lost connection
        for line in &mapped.lines {
            output.emit(line).map_err(QueryFailure::Fatal)?;
        }

        let mut rejected = Vec::new();
        for row_number in mapped.null_rows {
            let failure = reject_row(metric.name, format!("NULL value in row {row_number}"), output)
                .map_err(QueryFailure::Fatal)?;
            rejected.push(failure);
        }

        Ok(rejected)
    }
}
