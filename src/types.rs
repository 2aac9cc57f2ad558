//! Core domain types for metrics extraction
//!
//! This module defines the value objects flowing from the query executor
//! through classification into rendered metric lines. Rows are untyped at
//! compile time: every query decides its own arity and column types, so a
//! row is an ordered list of tagged scalars.

use crate::utils::sanitize_tag;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell returned by the query executor
///
/// The executor decides the variant from the column type it sees; the
/// classifier and formatter never coerce between variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Integral numeric value
    Integer(i64),

    /// Non-integral numeric value, already rounded by the query if needed
    Float(f64),

    /// Character data (names, statuses, dates rendered by the driver)
    Text(String),

    /// SQL NULL
    Null,
}

impl Scalar {
    /// Borrow the text content, if this cell is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the cell holds SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Render the cell as a tag value
    pub fn to_tag_value(&self) -> String {
        sanitize_tag(&self.to_string())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(v) => write!(f, "{v}"),
            // Debug keeps the trailing ".0" on integral floats (10.0, not 10)
            Scalar::Float(v) => write!(f, "{v:?}"),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Null => Ok(()),
        }
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(i64::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}

/// One row of a query result, in column order
///
/// ## Example Usage
/// ```rust
/// use oracle_metrics_agent::{ResultRow, Scalar};
///
/// let row = ResultRow::new(vec!["USERS".into(), 42.into()]);
/// assert_eq!(row.len(), 2);
/// assert_eq!(row.last(), Some(&Scalar::Integer(42)));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultRow {
    cells: Vec<Scalar>,
}

impl ResultRow {
    /// Create a row from its cells
    pub fn new(cells: Vec<Scalar>) -> Self {
        Self { cells }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at a zero-based column index
    pub fn get(&self, index: usize) -> Option<&Scalar> {
        self.cells.get(index)
    }

    /// Last cell of the row
    pub fn last(&self) -> Option<&Scalar> {
        self.cells.last()
    }

    /// All cells in column order
    pub fn cells(&self) -> &[Scalar] {
        &self.cells
    }

    /// Consume the row, yielding its cells
    pub fn into_cells(self) -> Vec<Scalar> {
        self.cells
    }
}

impl From<Vec<Scalar>> for ResultRow {
    fn from(cells: Vec<Scalar>) -> Self {
        Self::new(cells)
    }
}

impl FromIterator<Scalar> for ResultRow {
    fn from_iter<I: IntoIterator<Item = Scalar>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Operator-declared dynamic metric: one query mapped onto `oracle_<context>`
///
/// Loaded once from configuration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricBlock {
    /// Suffix of the measurement name
    pub context: String,

    /// SQL text submitted verbatim to the executor
    pub query: String,

    /// Tag name bound to the first column of two-column rows
    #[serde(default, alias = "tagField", skip_serializing_if = "Option::is_none")]
    pub tag_field: Option<String>,
}

impl MetricBlock {
    /// Create a block without an explicit tag field
    pub fn new(context: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            query: query.into(),
            tag_field: None,
        }
    }

    /// Bind the first column of two-column rows to `tag_field`
    pub fn with_tag_field(mut self, tag_field: impl Into<String>) -> Self {
        self.tag_field = Some(tag_field.into());
        self
    }

    /// Measurement name emitted for this block
    pub fn measurement(&self) -> String {
        format!("oracle_{}", self.context)
    }
}

/// Logical name of the monitored instance, attached to every line
///
/// Always sanitized on construction so it can be rendered as a tag value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    /// Build an identifier from arbitrary text
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(sanitize_tag(name.as_ref().trim()))
    }

    /// The sanitized identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
