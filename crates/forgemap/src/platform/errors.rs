use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::{HttpError, HttpResponse};

/// Errors that can occur when talking to a hosting provider.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// API error from the provider.
    #[error("API error: {message}")]
    Api { message: String },

    /// The provider rejected the request for exceeding its rate limit.
    #[error("Rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// Authentication required or failed.
    #[error("Authentication required")]
    AuthRequired,

    /// Resource not found (org, group, workspace, repository).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Unexpected/internal error, including undecodable payloads.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(". Resets at {}", at),
        None => String::new(),
    }
}

impl PlatformError {
    /// Create an API error.
    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a rate limit rejection (retryable).
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Classify a non-success response.
    ///
    /// `resource` names what was requested, for `NotFound` messages.
    pub fn from_response(response: &HttpResponse, resource: &str) -> Self {
        let body = String::from_utf8_lossy(&response.body);
        let message = body.lines().next().unwrap_or_default().trim().to_string();

        match response.status {
            401 => Self::AuthRequired,
            429 => Self::RateLimited {
                reset_at: parse_reset_header(response),
            },
            403 if is_rate_limit_rejection(response, &body) => Self::RateLimited {
                reset_at: parse_reset_header(response),
            },
            404 => Self::not_found(resource),
            status => Self::api(format!("HTTP {}: {}", status, message)),
        }
    }
}

impl From<HttpError> for PlatformError {
    fn from(err: HttpError) -> Self {
        Self::network(err.to_string())
    }
}

/// A 403 is a rate-limit rejection when the primary quota is spent, or when
/// the provider signals a secondary limit (`retry-after`, or a "rate limit"
/// message with quota still remaining).
fn is_rate_limit_rejection(response: &HttpResponse, body: &str) -> bool {
    response.header("x-ratelimit-remaining") == Some("0")
        || response.header("retry-after").is_some()
        || body.to_ascii_lowercase().contains("rate limit")
}

/// Read a reset time from `x-ratelimit-reset` (epoch seconds) or
/// `ratelimit-reset`, falling back to `retry-after` (seconds from now).
fn parse_reset_header(response: &HttpResponse) -> Option<DateTime<Utc>> {
    let epoch = response
        .header("x-ratelimit-reset")
        .or_else(|| response.header("ratelimit-reset"))
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    epoch.or_else(|| {
        response
            .header("retry-after")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
    })
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which is useful for errors
/// that include multi-line details.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
