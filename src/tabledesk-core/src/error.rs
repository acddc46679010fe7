//! Error taxonomy.
//!
//! Two disjoint classes of failure:
//! - [`UsageError`]: the caller broke a local precondition. Raised before any
//!   request is sent and never retryable.
//! - [`ApiError`]: a remote or transport failure, produced only by
//!   [`crate::classify`]. This is what retry and cache-fallback logic
//!   should branch on.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::models::FieldError;

/// Programmer-facing errors raised before any I/O
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("Invalid limit {value}: must be between 1 and {max}")]
    InvalidLimit { value: i64, max: u32 },

    #[error("Invalid skip {0}: must not be negative")]
    InvalidSkip(i64),

    #[error("Too many records: {count} exceeds the per-request cap of {max}")]
    TooManyRecords { count: usize, max: u32 },

    #[error("Record {index} cannot be serialized: {message}")]
    InvalidRecord { index: usize, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Context carried by every [`ApiError`] variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Human-readable, self-contained message
    pub message: String,
    /// HTTP status, absent for transport-level failures
    pub status: Option<u16>,
    /// Request URL (secrets redacted)
    pub url: String,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

/// Typed remote error. Exactly one variant is produced per failed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 401 / 403
    #[error("Authentication failed: {0}")]
    Authentication(ErrorContext),

    /// 404
    #[error("Not found: {0}")]
    NotFound(ErrorContext),

    /// 429
    #[error("Rate limited: {context}")]
    RateLimit {
        context: ErrorContext,
        /// Seconds to wait, from the `Retry-After` header
        retry_after: Option<u64>,
    },

    /// 400 / 422
    #[error("Validation failed: {context}")]
    Validation {
        context: ErrorContext,
        field_errors: Vec<FieldError>,
    },

    /// 5xx
    #[error("Server error: {0}")]
    Server(ErrorContext),

    /// Any other status, or a transport failure with no status at all
    #[error("Request failed: {context}")]
    Generic {
        context: ErrorContext,
        field_errors: Vec<FieldError>,
    },
}

impl ApiError {
    /// Build a `Generic` error for a failure that produced no HTTP response
    pub fn transport(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Generic {
            context: ErrorContext {
                message: message.into(),
                status: None,
                url: url.into(),
            },
            field_errors: Vec::new(),
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Authentication(context) | Self::NotFound(context) | Self::Server(context) => {
                context
            }
            Self::RateLimit { context, .. }
            | Self::Validation { context, .. }
            | Self::Generic { context, .. } => context,
        }
    }

    pub fn message(&self) -> &str {
        &self.context().message
    }

    pub fn status(&self) -> Option<u16> {
        self.context().status
    }

    pub fn url(&self) -> &str {
        &self.context().url
    }

    /// Field-level errors (empty for variants that carry none)
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation { field_errors, .. } | Self::Generic { field_errors, .. } => {
                field_errors
            }
            _ => &[],
        }
    }

    /// Retry-after hint, only ever present on `RateLimit`
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit {
                retry_after: Some(seconds),
                ..
            } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    /// Whether a caller-side retry policy may retry this failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit { .. } | Self::Server(_))
    }

    /// Stable name of the variant, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::NotFound(_) => "not_found",
            Self::RateLimit { .. } => "rate_limit",
            Self::Validation { .. } => "validation",
            Self::Server(_) => "server",
            Self::Generic { .. } => "generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(status: Option<u16>) -> ErrorContext {
        ErrorContext {
            message: "boom".to_string(),
            status,
            url: "https://example.test/x".to_string(),
        }
    }

    #[test]
    fn test_retryable_variants() {
        assert!(ApiError::Server(context(Some(503))).is_retryable());
        assert!(ApiError::RateLimit {
            context: context(Some(429)),
            retry_after: None
        }
        .is_retryable());
        assert!(!ApiError::Validation {
            context: context(Some(422)),
            field_errors: vec![]
        }
        .is_retryable());
        assert!(!ApiError::transport("connection refused", "u").is_retryable());
    }

    #[test]
    fn test_display_is_self_contained() {
        let err = ApiError::NotFound(context(Some(404)));
        assert_eq!(err.to_string(), "Not found: boom (HTTP 404)");

        let err = ApiError::transport("dns failure", "https://example.test");
        assert_eq!(err.to_string(), "Request failed: dns failure");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_retry_after_duration() {
        let err = ApiError::RateLimit {
            context: context(Some(429)),
            retry_after: Some(30),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(ApiError::Server(context(Some(500))).retry_after(), None);
    }
}
