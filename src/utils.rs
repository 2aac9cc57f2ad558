//! Sanitization and validation utilities
//!
//! This module provides the tag sanitizer used for every tag value the agent
//! emits, plus validation of operator-supplied names (dynamic metric contexts
//! and tag fields) so that configuration mistakes surface before connecting.

use super::*;
use lazy_static::lazy_static;
use regex::Regex;

// Maximum allowed lengths for operator-supplied names
const MAX_CONTEXT_LENGTH: usize = 128;
const MAX_TAG_FIELD_LENGTH: usize = 128;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref CONTEXT_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_:.\-]+$").unwrap();
    static ref TAG_FIELD_REGEX: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
}

/// Turn arbitrary text into a tag token
///
/// Every maximal run of whitespace becomes a single underscore. Case and
/// punctuation are left alone, and the function is idempotent.
///
/// # Examples
/// ```rust
/// use oracle_metrics_agent::sanitize_tag;
///
/// assert_eq!(sanitize_tag("Host CPU Utilization (%)"), "Host_CPU_Utilization_(%)");
/// assert_eq!(sanitize_tag("User  I/O"), "User_I/O");
/// assert_eq!(sanitize_tag(""), "");
/// ```
pub fn sanitize_tag(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, "_").into_owned()
}

/// Validate a dynamic metric context
///
/// The context becomes part of the measurement name `oracle_<context>`, so
/// it must be non-empty and free of whitespace, commas and `=`.
pub fn validate_context(context: &str) -> Result<()> {
    if context.is_empty() {
        return Err(agent_validation_error("context", "Metric context cannot be empty"));
    }

    if context.len() > MAX_CONTEXT_LENGTH {
        return Err(agent_validation_error(
            "context",
            format!("Metric context too long (max {MAX_CONTEXT_LENGTH} chars)"),
        ));
    }

    if !CONTEXT_REGEX.is_match(context) {
        return Err(agent_validation_error(
            "context",
            format!("Invalid metric context '{context}' (must match [a-zA-Z0-9_:.-]+)"),
        ));
    }

    Ok(())
}

/// Validate an instance name before it is written as the `instance` tag
///
/// Whitespace is sanitized away later, but `,` and `=` would split the tag
/// set of every line.
pub fn validate_instance(instance: &str) -> Result<()> {
    if instance.trim().is_empty() {
        return Err(agent_validation_error("instance", "Instance cannot be blank"));
    }

    if instance.contains(&[',', '='][..]) {
        return Err(agent_validation_error(
            "instance",
            format!("Invalid instance '{instance}' (must not contain ',' or '=')"),
        ));
    }

    Ok(())
}

/// Validate an explicit tag field name
pub fn validate_tag_field(tag_field: &str) -> Result<()> {
    if tag_field.is_empty() {
        return Err(agent_validation_error("tag_field", "Tag field cannot be empty"));
    }

    if tag_field.len() > MAX_TAG_FIELD_LENGTH {
        return Err(agent_validation_error(
            "tag_field",
            format!("Tag field too long (max {MAX_TAG_FIELD_LENGTH} chars)"),
        ));
    }

    // "instance" is always the first tag of every line
    if tag_field == "instance" {
        return Err(agent_validation_error(
            "tag_field",
            "Tag field 'instance' is reserved",
        ));
    }

    if !TAG_FIELD_REGEX.is_match(tag_field) {
        return Err(agent_validation_error(
            "tag_field",
            format!("Invalid tag field '{tag_field}' (must match [a-zA-Z_][a-zA-Z0-9_]*)"),
        ));
    }

    Ok(())
}

/// Validate a whole dynamic metric declaration
pub fn validate_block(block: &MetricBlock) -> Result<()> {
    validate_context(&block.context)?;

    if block.query.trim().is_empty() {
        return Err(agent_validation_error(
            "query",
            format!("Metric '{}' has an empty query", block.context),
        ));
    }

    if let Some(tag_field) = &block.tag_field {
        validate_tag_field(tag_field)?;
    }

    Ok(())
}

/// Collapse text onto one line for the error channel
///
/// Driver messages often span several lines; the collector reads the
/// error channel line by line.
pub fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
