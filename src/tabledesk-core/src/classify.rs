//! HTTP failure classification.
//!
//! [`classify`] is a pure function of status, parsed body, URL and the
//! retry-after hint. It never fails: bodies that cannot be understood degrade
//! to a message synthesized from the status line.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{ApiError, ErrorContext};
use crate::models::{join_field_errors, FieldError};

/// Longest body text carried into an error message
const MAX_MESSAGE_LEN: usize = 4096;

/// Response body after a best-effort parse
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).trim().to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct ParsedError {
    message: Option<String>,
    field_errors: Vec<FieldError>,
}

fn parse_error_body(body: &ResponseBody) -> ParsedError {
    match body {
        ResponseBody::Json(Value::Object(object)) => {
            let field_errors = object
                .get("errors")
                .and_then(Value::as_array)
                .map(|errors| parse_field_errors(errors))
                .unwrap_or_default();
            let message = ["message", "error", "description"]
                .iter()
                .find_map(|name| object.get(*name).and_then(Value::as_str))
                .filter(|message| !message.trim().is_empty())
                .map(str::to_string);
            ParsedError {
                message,
                field_errors,
            }
        }
        ResponseBody::Json(Value::Array(errors)) => ParsedError {
            message: None,
            field_errors: parse_field_errors(errors),
        },
        ResponseBody::Json(Value::String(text)) | ResponseBody::Text(text)
            if !text.trim().is_empty() =>
        {
            ParsedError {
                message: Some(truncate(text)),
                field_errors: Vec::new(),
            }
        }
        _ => ParsedError::default(),
    }
}

fn parse_field_errors(errors: &[Value]) -> Vec<FieldError> {
    errors
        .iter()
        .filter_map(|entry| match entry {
            Value::String(message) => Some(FieldError {
                column: None,
                message: message.clone(),
            }),
            other => serde_json::from_value::<FieldError>(other.clone()).ok(),
        })
        .filter(|error| !error.message.is_empty())
        .collect()
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.len() <= MAX_MESSAGE_LEN {
        return text.to_string();
    }
    let mut end = MAX_MESSAGE_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

fn status_line(status: u16) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason());
    match reason {
        Some(reason) => format!("{} {}", status, reason),
        None => format!("HTTP {}", status),
    }
}

/// Map a failed response onto exactly one [`ApiError`] variant
pub fn classify(
    status: u16,
    body: &ResponseBody,
    url: &str,
    retry_after: Option<u64>,
) -> ApiError {
    let parsed = parse_error_body(body);
    let message = if !parsed.field_errors.is_empty() {
        join_field_errors(&parsed.field_errors)
    } else {
        parsed.message.unwrap_or_else(|| status_line(status))
    };
    let context = ErrorContext {
        message,
        status: Some(status),
        url: url.to_string(),
    };

    match status {
        401 | 403 => ApiError::Authentication(context),
        404 => ApiError::NotFound(context),
        429 => ApiError::RateLimit {
            context,
            retry_after,
        },
        400 | 422 => ApiError::Validation {
            context,
            field_errors: parsed.field_errors,
        },
        s if s >= 500 => ApiError::Server(context),
        _ => ApiError::Generic {
            context,
            field_errors: parsed.field_errors,
        },
    }
}

/// Parse a `Retry-After` header value into whole seconds.
///
/// Accepts delta-seconds or an HTTP-date; dates in the past yield zero.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    parse_retry_after_at(value, Utc::now())
}

fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&Utc) - now;
    Some(delta.num_seconds().max(0) as u64)
}
