//! Error taxonomy for icon service operations
//!
//! Every failure an operation can produce is classified into one of the
//! [`ErrorKind`] categories so the invoking runtime can decide whether to
//! retry, ask for different input, or give up. Nothing here retries.

use crate::config::ConfigError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Main error type for icon service operations
#[derive(Debug, Error)]
pub enum IconError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Authentication rejected by upstream (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Rate limited by upstream: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Upstream error: {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Request cancelled")]
    Cancelled,
}

/// Stable classification of an [`IconError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArgument,
    ConfigurationError,
    AuthenticationError,
    NotFound,
    RateLimited,
    UpstreamError,
    TransportError,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::AuthenticationError => "AuthenticationError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::UpstreamError => "UpstreamError",
            ErrorKind::TransportError => "TransportError",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error body handed back to the tool runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl IconError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IconError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            IconError::Configuration(_) => ErrorKind::ConfigurationError,
            IconError::Authentication { .. } => ErrorKind::AuthenticationError,
            IconError::NotFound { .. } => ErrorKind::NotFound,
            IconError::RateLimited { .. } => ErrorKind::RateLimited,
            IconError::Upstream { .. } => ErrorKind::UpstreamError,
            IconError::Transport { .. } => ErrorKind::TransportError,
            IconError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Retry hint reported by the upstream, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            IconError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether a caller could reasonably retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IconError::RateLimited { .. } | IconError::Upstream { .. } | IconError::Transport { .. }
        )
    }

    /// Convert into the payload surfaced to the tool runtime
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: sanitize_error_message(&self.to_string()),
            retry_after_secs: self.retry_after().map(|d| d.as_secs()),
        }
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Upstream answered, but the answer is unusable
    pub fn malformed_response<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            status: None,
            message: format!("malformed response: {}", message.into()),
        }
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status.
    ///
    /// `retry_after` is the raw `Retry-After` header value, if one was sent.
    pub fn from_status(status: u16, retry_after: Option<&str>, body: &str) -> Self {
        let message = summarize_body(status, body);
        match status {
            400 => Self::InvalidArgument { message },
            401 | 403 => Self::Authentication { status, message },
            404 => Self::NotFound { message },
            429 => Self::RateLimited {
                message,
                retry_after: retry_after.and_then(parse_retry_after),
            },
            _ => Self::Upstream {
                status: Some(status),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for IconError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            IconError::malformed_response(e.to_string())
        } else if e.is_timeout() {
            IconError::transport(format!("request timed out: {e}"))
        } else if e.is_builder() {
            IconError::invalid_argument(format!("could not build request: {e}"))
        } else {
            IconError::transport(e.to_string())
        }
    }
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP-date
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let when = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let delta = (when - now).num_seconds().max(0);
    Some(Duration::from_secs(delta as u64))
}

fn summarize_body(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

fn secret_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(password|token|key|secret|signature)[=:]\s*[^\s,&"]+"#)
            .expect("secret pattern is valid")
    })
}

fn oauth_header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(oauth_[a-z_]+)="[^"]*""#).expect("oauth pattern is valid")
    })
}

/// Sanitize error messages so credentials never reach the tool runtime
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = oauth_header_pattern()
        .replace_all(message, "${1}=\"***\"")
        .to_string();

    sanitized = secret_pattern()
        .replace_all(&sanitized, "${1}=***")
        .to_string();

    // Truncate very long messages - ensure total length is <= 500
    if sanitized.len() > 500 {
        let truncate_suffix = "...[truncated]";
        let mut cut = 500 - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for icon service operations
pub type IconResult<T> = Result<T, IconError>;
