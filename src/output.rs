//! Output streams
//!
//! Metric lines go to the metric stream (stdout in production) and nothing
//! else does. Failures go to the error channel (stderr) as `ERROR|<message>`
//! lines, one per failure.

use super::*;
use crate::utils::single_line;
use std::io::Write;

/// Prefix the collector looks for on the error channel
pub const ERROR_PREFIX: &str = "ERROR|";

/// Writer pair for metric lines and the error channel
pub struct MetricOutput<O: Write, E: Write> {
    out: O,
    err: E,
    lines_written: usize,
    errors_reported: usize,
}

impl MetricOutput<std::io::Stdout, std::io::Stderr> {
    /// Metric lines on stdout, errors on stderr
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<O: Write, E: Write> MetricOutput<O, E> {
    /// Wrap arbitrary writers (buffers in tests)
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            lines_written: 0,
            errors_reported: 0,
        }
    }

    /// Write one rendered metric line
    pub fn emit(&mut self, line: &MetricLine) -> Result<()> {
        self.out
            .write_all(line.render().as_bytes())
            .map_err(|e| from_io_error("metric stream", e))?;
        self.lines_written += 1;
        Ok(())
    }

    /// Write one `ERROR|<message>` line to the error channel
    pub fn report(&mut self, message: impl std::fmt::Display) -> Result<()> {
        let message = single_line(&message.to_string());
        writeln!(self.err, "{ERROR_PREFIX}{message}")
            .map_err(|e| from_io_error("error channel", e))?;
        self.err
            .flush()
            .map_err(|e| from_io_error("error channel", e))?;
        self.errors_reported += 1;
        Ok(())
    }

    /// Flush the metric stream
    pub fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| from_io_error("metric stream", e))
    }

    /// Number of metric lines written so far
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Number of error lines written so far
    pub fn errors_reported(&self) -> usize {
        self.errors_reported
    }

    /// Take back the underlying writers
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_emit_writes_rendered_line() {
        let mut output = MetricOutput::new(Vec::new(), Vec::new());
        let line = MetricLine::new("oracle_x", &InstanceId::new("T1")).with_field("value", 1);

        output.emit(&line).unwrap();
        output.flush().unwrap();

        assert_eq!(output.lines_written(), 1);
        let (out, err) = output.into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "oracle_x,instance=T1 value=1\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_report_uses_error_prefix_on_one_line() {
        let mut output = MetricOutput::new(Vec::new(), Vec::new());
        output
            .report("locks: ORA-00942: table or view does not exist\n  at line 1")
            .unwrap();

        assert_eq!(output.errors_reported(), 1);
        let (out, err) = output.into_inner();
        assert!(out.is_empty());
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "ERROR|locks: ORA-00942: table or view does not exist at line 1\n"
        );
    }

    #[test]
    fn test_emit_failure_is_an_error() {
        let mut output = MetricOutput::new(BrokenPipe, Vec::new());
        let line = MetricLine::new("oracle_x", &InstanceId::new("T1")).with_field("value", 1);

        let err = output.emit(&line).unwrap_err();
        assert!(err.to_string().contains("metric stream"));
        assert_eq!(output.lines_written(), 0);
    }
}
