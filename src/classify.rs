//! Row classification for dynamic metrics
//!
//! Decides which columns of an arbitrary result row are tags and which one
//! is the value, without looking at column types.

use crate::types::{ResultRow, Scalar};

/// Tags and value extracted from one row
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    /// Tag names and raw cells, in column order
    pub tags: Vec<(String, Scalar)>,

    /// The cell emitted as the metric value, untouched
    pub value: Scalar,
}

/// Split a row into tags and a value
///
/// With an explicit tag field and exactly two columns, the first column is
/// bound to that name and the second is the value. Every other shape uses
/// the positional rule: the last column is the value and the preceding ones
/// become `c1`, `c2`, ... from left to right.
///
/// Returns `None` only for a row with no columns at all.
///
/// # Examples
/// ```rust
/// use oracle_metrics_agent::{classify_row, ResultRow, Scalar};
///
/// let row = ResultRow::new(vec!["USERS".into(), 42.into()]);
/// let classified = classify_row(&row, Some("tbs")).unwrap();
/// assert_eq!(classified.tags, vec![("tbs".to_string(), Scalar::from("USERS"))]);
/// assert_eq!(classified.value, Scalar::Integer(42));
/// ```
pub fn classify_row(row: &ResultRow, tag_field: Option<&str>) -> Option<Classified> {
    let (value, leading) = row.cells().split_last()?;

    let tags = match (tag_field, leading) {
        (Some(name), [tag]) => vec![(name.to_string(), tag.clone())],
        _ => leading
            .iter()
            .enumerate()
            .map(|(index, cell)| (format!("c{}", index + 1), cell.clone()))
            .collect(),
    };

    Some(Classified {
        tags,
        value: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: Vec<Scalar>) -> ResultRow {
        ResultRow::new(cells)
    }

    #[test]
    fn test_explicit_tag_field_two_columns() {
        let classified = classify_row(&row(vec!["USERS".into(), 42.into()]), Some("foo")).unwrap();

        assert_eq!(classified.tags, vec![("foo".to_string(), Scalar::from("USERS"))]);
        assert_eq!(classified.value, Scalar::Integer(42));
    }

    #[test]
    fn test_positional_fallback() {
        let classified = classify_row(
            &row(vec!["App".into(), "evt".into(), 5.into(), 2.5.into()]),
            None,
        )
        .unwrap();

        assert_eq!(
            classified.tags,
            vec![
                ("c1".to_string(), Scalar::from("App")),
                ("c2".to_string(), Scalar::from("evt")),
                ("c3".to_string(), Scalar::Integer(5)),
            ]
        );
        assert_eq!(classified.value, Scalar::Float(2.5));
    }

    #[test]
    fn test_explicit_tag_field_ignored_for_other_arities() {
        let classified = classify_row(
            &row(vec!["SYS".into(), "TABLE".into(), 12.into()]),
            Some("owner"),
        )
        .unwrap();

        let names: Vec<&str> = classified.tags.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["c1", "c2"]);
        assert_eq!(classified.value, Scalar::Integer(12));
    }

    #[test]
    fn test_single_column_row() {
        let classified = classify_row(&row(vec![7.into()]), None).unwrap();
        assert!(classified.tags.is_empty());
        assert_eq!(classified.value, Scalar::Integer(7));

        let with_field = classify_row(&row(vec![7.into()]), Some("foo")).unwrap();
        assert!(with_field.tags.is_empty());
    }

    #[test]
    fn test_two_columns_without_tag_field() {
        let classified = classify_row(&row(vec!["ACTIVE".into(), 3.into()]), None).unwrap();
        assert_eq!(classified.tags, vec![("c1".to_string(), Scalar::from("ACTIVE"))]);
        assert_eq!(classified.value, Scalar::Integer(3));
    }

    #[test]
    fn test_value_passed_through_verbatim() {
        let classified = classify_row(&row(vec!["x".into(), "not a number".into()]), None).unwrap();
        assert_eq!(classified.value, Scalar::from("not a number"));

        let null_value = classify_row(&row(vec!["x".into(), Scalar::Null]), None).unwrap();
        assert_eq!(null_value.value, Scalar::Null);
    }

    #[test]
    fn test_empty_row() {
        assert!(classify_row(&ResultRow::default(), None).is_none());
    }
}
