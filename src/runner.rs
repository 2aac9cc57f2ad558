//! Dynamic metric runner
//!
//! Turns operator-declared [`MetricBlock`]s into metric lines. Each block
//! moves through execute, classify and emit; a block whose query fails is
//! reported on the error channel and skipped, and the next block runs.
//! Only a lost connection stops the loop.

use super::*;
use std::io::Write;
use tracing::{debug, warn};

/// A collector that failed without ending the run
#[derive(Debug)]
pub struct CollectorFailure {
    /// Fixed emitter name or dynamic context
    pub collector: String,

    /// What went wrong, already carrying the collector name
    pub error: TylError,
}

/// Result of running one dynamic block
#[derive(Debug)]
pub enum BlockOutcome {
    /// The query ran; every usable row became a line
    Emitted {
        /// Lines written for this block
        lines: usize,

        /// Rows that could not become a line (no columns, NULL value)
        rejected: Vec<CollectorFailure>,
    },

    /// The query failed; nothing was written for this block
    Failed(CollectorFailure),
}

/// Runs dynamic metric blocks against one executor
pub struct DynamicMetricRunner<'a, E: QueryExecutor> {
    executor: &'a E,
    instance: &'a InstanceId,
}

impl<'a, E: QueryExecutor> DynamicMetricRunner<'a, E> {
    /// Create a runner sharing the run's executor and instance identifier
    pub fn new(executor: &'a E, instance: &'a InstanceId) -> Self {
        Self { executor, instance }
    }

    /// Run every block in declaration order
    ///
    /// # Returns
    /// * `Result<Vec<CollectorFailure>>` - Blocks and rows that failed and
    ///   were skipped, or the fatal error that stopped the run
    pub async fn run<O: Write, W: Write>(
        &self,
        blocks: &[MetricBlock],
        output: &mut MetricOutput<O, W>,
    ) -> Result<Vec<CollectorFailure>> {
        let mut failures = Vec::new();

        for block in blocks {
            match self.run_block(block, output).await? {
                BlockOutcome::Emitted { lines, rejected } => {
                    debug!(context = %block.context, lines, rejected = rejected.len(), "dynamic metric emitted");
                    failures.extend(rejected);
                }
                BlockOutcome::Failed(failure) => failures.push(failure),
            }
        }

        Ok(failures)
    }

    /// Run a single block
    ///
    /// A recoverable query failure becomes [`BlockOutcome::Failed`]; a fatal
    /// one is returned as `Err`. NULL tag cells are left out of the line; a
    /// row without columns or with a NULL value is reported and skipped.
    pub async fn run_block<O: Write, W: Write>(
        &self,
        block: &MetricBlock,
        output: &mut MetricOutput<O, W>,
    ) -> Result<BlockOutcome> {
        debug!(context = %block.context, "executing dynamic metric query");

        let rows = match self.executor.query(&block.query).await {
            Ok(rows) => rows,
            Err(failure) => {
                return isolate_failure(&block.context, failure, output).map(BlockOutcome::Failed)
            }
        };

        let measurement = block.measurement();
        let tag_field = block.tag_field.as_deref();
        let mut lines = 0;
        let mut rejected = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let row_number = index + 1;

            let Some(classified) = classify_row(row, tag_field) else {
                rejected.push(reject_row(&block.context, format!("row {row_number} has no columns"), output)?);
                continue;
            };

            let line = MetricLine::new(measurement.as_str(), self.instance)
                .with_tags(classified.tags.into_iter().filter(|(_, cell)| !cell.is_null()))
                .with_field("value", classified.value);

            if !line.has_fields() {
                rejected.push(reject_row(&block.context, format!("NULL value in row {row_number}"), output)?);
                continue;
            }

            output.emit(&line)?;
            lines += 1;
        }

        Ok(BlockOutcome::Emitted { lines, rejected })
    }
}

/// Report a recoverable failure and hand it back, or escalate a fatal one
pub(crate) fn isolate_failure<O: Write, W: Write>(
    collector: &str,
    failure: QueryFailure,
    output: &mut MetricOutput<O, W>,
) -> Result<CollectorFailure> {
    let fatal = failure.is_fatal();
    let error = failure.into_error().with_collector(collector);

    if fatal {
        return Err(error);
    }

    warn!(collector, error = %error, "collector failed, continuing");
    output.report(&error)?;

    Ok(CollectorFailure {
        collector: collector.to_string(),
        error,
    })
}

/// Report one row that cannot be written as a line
pub(crate) fn reject_row<O: Write, W: Write>(
    collector: &str,
    reason: String,
    output: &mut MetricOutput<O, W>,
) -> Result<CollectorFailure> {
    isolate_failure(
        collector,
        QueryFailure::Recoverable(agent_validation_error("row", reason)),
        output,
    )
}
