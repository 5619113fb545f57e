//! Conversion of exported timestamps such as `Mon, 02 Jan 2006 15:04:05 -0700`
//! into UTC instants.

use chrono::{DateTime, Utc, Weekday};
use serde_json::Value;
use thiserror::Error;

use crate::record::json_kind;

/// Layout of the timestamp after the leading weekday name.
pub const DATE_BODY_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DateError {
    #[error("expected a date string, found {found}")]
    NotAString { found: &'static str },

    #[error("'{0}' does not start with a weekday name")]
    MissingWeekday(String),

    #[error("'{value}' could not be parsed: {source}")]
    Parse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Parses `%a, %d %b %Y %H:%M:%S %z` and shifts the result to UTC by
/// subtracting the embedded offset.
///
/// The weekday must be a three-letter abbreviation (any case) but is not
/// checked against the date. Surrounding whitespace is not accepted.
pub fn parse_offset_timestamp(value: &str) -> Result<DateTime<Utc>, DateError> {
    let body = value
        .split_once(',')
        .filter(|(weekday, _)| weekday.len() == 3 && weekday.parse::<Weekday>().is_ok())
        .and_then(|(_, body)| body.strip_prefix(char::is_whitespace))
        .ok_or_else(|| DateError::MissingWeekday(value.to_string()))?;

    let parsed = DateTime::parse_from_str(body.trim_start(), DATE_BODY_FORMAT).map_err(
        |source| DateError::Parse {
            value: value.to_string(),
            source,
        },
    )?;

    Ok(parsed.with_timezone(&Utc))
}

/// Normalizes one date-bearing field. Absent, `null` and empty values stay
/// absent.
pub fn normalize(value: Option<&Value>) -> Result<Option<DateTime<Utc>>, DateError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => parse_offset_timestamp(text).map(Some),
        Some(other) => Err(DateError::NotAString {
            found: json_kind(other),
        }),
    }
}
