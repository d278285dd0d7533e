use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("'{0}' is not a valid boolean")]
    InvalidBoolean(String),

    #[error("'{0}' is not a valid date-time")]
    InvalidInstant(String),
}

/// Page defaults to 1, page size to 20 (at most 100)
pub fn validate_pagination(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    (page, limit)
}

/// Coerce a loosely typed flag into a bool.
///
/// Accepts JSON booleans, the numbers `0`/`1` and the strings
/// `"true"`, `"false"`, `"1"`, `"0"` (trimmed, case-insensitive).
/// `null` and blank strings yield `None` so the caller can apply its default.
pub fn parse_boolean(raw: &Value) -> Result<Option<bool>, ParseError> {
    match raw {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(Some(true)),
            Some(0) => Ok(Some(false)),
            _ => Err(ParseError::InvalidBoolean(n.to_string())),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(ParseError::InvalidBoolean(s.clone())),
            }
        }
        other => Err(ParseError::InvalidBoolean(other.to_string())),
    }
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ParseError::InvalidInstant(raw.to_string()))
}
