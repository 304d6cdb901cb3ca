//! Shared validation helpers for inbound HTTP adapters.
//!
//! Path segments and query values arrive as strings; these helpers turn them
//! into typed identifiers and timestamps, reporting the offending field in
//! the error details.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidTimestamp,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

/// Name of a request field as the caller spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: Option<&str>) -> Error {
    let mut details = json!({
        "field": field.as_str(),
        "code": code.as_str(),
    });
    if let Some(value) = value {
        details["value"] = json!(value);
    }
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        format!("missing required field: {name}"),
        ErrorCode::MissingField,
        None,
    )
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    field_error(
        field,
        format!("{name} must be a valid UUID"),
        ErrorCode::InvalidUuid,
        Some(value),
    )
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    field_error(
        field,
        format!("{name} must be an RFC 3339 timestamp"),
        ErrorCode::InvalidTimestamp,
        Some(value),
    )
}

/// Parse a UUID-backed identifier such as [`crate::domain::LenderId`].
pub(crate) fn parse_id<T>(value: &str, field: FieldName) -> Result<T, Error>
where
    T: FromStr,
{
    value
        .trim()
        .parse()
        .map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn parse_rfc3339_timestamp(value: &str, field: FieldName) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid_timestamp_error(field, value))
}
