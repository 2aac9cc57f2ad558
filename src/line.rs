//! Metric line construction and rendering
//!
//! A [`MetricLine`] is built, rendered once and dropped. The grammar is the
//! collector's line protocol without timestamps:
//!
//! ```text
//! <measurement>,instance=<id>[,<tag>=<value>]... <field>=<value>[,<field>=<value>]...
//! ```

use crate::types::{InstanceId, Scalar};
use crate::utils::sanitize_tag;
use std::fmt;

/// One metric point ready to be written to the output stream
///
/// Tag values are sanitized when added, so rendering never rewrites them.
///
/// ## Example Usage
/// ```rust
/// use oracle_metrics_agent::{InstanceId, MetricLine};
///
/// let line = MetricLine::new("oracle_wait_class", &InstanceId::new("T1"))
///     .with_tag("wait_class", "User I/O")
///     .with_field("wait_value", 0.123);
///
/// assert_eq!(
///     line.render(),
///     "oracle_wait_class,instance=T1,wait_class=User_I/O wait_value=0.123\n"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    measurement: String,
    instance: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, Scalar)>,
}

impl MetricLine {
    /// Start a line for `measurement` on `instance`
    pub fn new(measurement: impl Into<String>, instance: &InstanceId) -> Self {
        Self {
            measurement: measurement.into(),
            instance: instance.as_str().to_string(),
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Append a tag; the value is sanitized
    pub fn with_tag(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.tags.push((name.into(), sanitize_tag(&value.to_string())));
        self
    }

    /// Append tags in iteration order
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: fmt::Display,
    {
        for (name, value) in tags {
            self = self.with_tag(name, value);
        }
        self
    }

    /// Append a field; NULL values are left out
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.fields.push((name.into(), value));
        }
        self
    }

    /// Whether the line carries at least one field and can be written
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Get the measurement name
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Get the tags after `instance`, in emission order
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// Get the fields, in emission order
    pub fn fields(&self) -> &[(String, Scalar)] {
        &self.fields
    }

    /// Render the line including its newline terminator
    pub fn render(&self) -> String {
        format_line(&self.measurement, &self.instance, &self.tags, &self.fields)
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(f, &self.measurement, &self.instance, &self.tags, &self.fields)
    }
}

/// Render one line from its parts
///
/// Tag values must already be sanitized; field values are written in their
/// native textual form. The result ends with exactly one `\n`.
///
/// Text field values are not quoted or escaped, so a dynamic query whose
/// last column is text containing spaces or commas (`IN USE`) yields a line
/// the collector cannot parse. Dynamic queries should return a numeric last
/// column.
///
/// # Examples
/// ```rust
/// use oracle_metrics_agent::{format_line, Scalar};
///
/// let line = format_line(
///     "oracle_status",
///     "T1",
///     &[("metric_name", "instance_status")],
///     &[("metric_value", Scalar::Integer(1))],
/// );
/// assert_eq!(line, "oracle_status,instance=T1,metric_name=instance_status metric_value=1\n");
/// ```
pub fn format_line<K, V, F>(
    measurement: &str,
    instance: &str,
    tags: &[(K, V)],
    fields: &[(F, Scalar)],
) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
    F: AsRef<str>,
{
    let mut line = String::with_capacity(64);
    // Writing into a String cannot fail
    let _ = write_line(&mut line, measurement, instance, tags, fields);
    line.push('\n');
    line
}

fn write_line<W, K, V, F>(
    out: &mut W,
    measurement: &str,
    instance: &str,
    tags: &[(K, V)],
    fields: &[(F, Scalar)],
) -> fmt::Result
where
    W: fmt::Write,
    K: AsRef<str>,
    V: AsRef<str>,
    F: AsRef<str>,
{
    write!(out, "{measurement},instance={instance}")?;
    for (name, value) in tags {
        write!(out, ",{}={}", name.as_ref(), value.as_ref())?;
    }

    let mut separator = ' ';
    for (name, value) in fields {
        write!(out, "{separator}{}={value}", name.as_ref())?;
        separator = ',';
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_grammar() {
        let line = format_line(
            "oracle_wait_class",
            "T1",
            &[("wait_class", "User_I/O")],
            &[("wait_value", Scalar::Float(0.123))],
        );
        assert_eq!(
            line,
            "oracle_wait_class,instance=T1,wait_class=User_I/O wait_value=0.123\n"
        );
    }

    #[test]
    fn test_format_line_without_extra_tags() {
        let no_tags: [(&str, &str); 0] = [];
        let line = format_line("oracle_uptime", "T1", &no_tags, &[("value", Scalar::Integer(7))]);
        assert_eq!(line, "oracle_uptime,instance=T1 value=7\n");
    }

    #[test]
    fn test_format_line_multiple_fields_in_order() {
        let line = format_line(
            "oracle_tablespaces",
            "T1",
            &[("tbs_name", "USERS")],
            &[
                ("used_space_mb", Scalar::Integer(10)),
                ("free_space_mb", Scalar::Integer(90)),
                ("percent_used", Scalar::Float(10.0)),
                ("max_size_mb", Scalar::Integer(100)),
            ],
        );
        assert_eq!(
            line,
            "oracle_tablespaces,instance=T1,tbs_name=USERS used_space_mb=10,free_space_mb=90,percent_used=10.0,max_size_mb=100\n"
        );
    }

    #[test]
    fn test_format_line_does_not_resanitize() {
        // Caller is responsible for sanitizing; rendering is a pure join
        let line = format_line("m", "T1", &[("t", "a b")], &[("value", Scalar::Integer(1))]);
        assert_eq!(line, "m,instance=T1,t=a b value=1\n");
    }

    #[test]
    fn test_builder_sanitizes_tags_and_keeps_order() {
        let line = MetricLine::new("oracle_locks", &InstanceId::new("T1"))
            .with_tags(vec![("c1", "App Schema"), ("c2", "evt")])
            .with_tag("c3", Scalar::Integer(5))
            .with_field("value", 2.5);

        assert_eq!(line.measurement(), "oracle_locks");
        assert_eq!(line.tags()[0], ("c1".to_string(), "App_Schema".to_string()));
        assert_eq!(line.fields().len(), 1);
        assert_eq!(
            line.render(),
            "oracle_locks,instance=T1,c1=App_Schema,c2=evt,c3=5 value=2.5\n"
        );
    }

    #[test]
    fn test_null_fields_are_left_out() {
        let line = MetricLine::new("oracle_tablespaces", &InstanceId::new("T1"))
            .with_tag("tbs_name", "USERS")
            .with_field("used_space_mb", 10)
            .with_field("max_size_mb", Scalar::Null);

        assert!(line.has_fields());
        assert_eq!(
            line.render(),
            "oracle_tablespaces,instance=T1,tbs_name=USERS used_space_mb=10\n"
        );

        let empty = MetricLine::new("oracle_x", &InstanceId::new("T1")).with_field("value", Scalar::Null);
        assert!(!empty.has_fields());
    }

    #[test]
    fn test_display_has_no_terminator() {
        let line = MetricLine::new("oracle_x", &InstanceId::new("T1")).with_field("value", 1);
        assert_eq!(line.to_string(), "oracle_x,instance=T1 value=1");
        assert!(line.render().ends_with("value=1\n"));
        assert!(!line.render().ends_with(" \n"));
    }
}
