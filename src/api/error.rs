//! Error types for the API client.
//!
//! Every variant carries the URL that failed so log lines and user-facing
//! diagnostics can point at the exact request.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the messaging API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Transport {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP 429 without a usable `Retry-After` hint.
    #[error("rate limit exceeded requesting {url}")]
    RateLimited {
        /// The throttled URL.
        url: String,
        /// The raw `Retry-After` value, if the server sent one we could not parse.
        retry_after: Option<String>,
    },

    /// The injected retry budget ran out while the server kept throttling.
    #[error("rate limit retry budget exhausted for {url} after {attempts} attempts ({waited:?} waited)")]
    RetryBudgetExhausted {
        /// The throttled URL.
        url: String,
        /// Attempts made, including the first.
        attempts: u32,
        /// Total time spent sleeping on rate-limit hints.
        waited: Duration,
    },

    /// The caller cancelled while a rate-limit wait was pending.
    #[error("cancelled while waiting to retry {url}")]
    Cancelled {
        /// The URL whose retry was abandoned.
        url: String,
    },

    /// Any non-success status other than 429.
    #[error("HTTP {status} requesting {url}")]
    Upstream {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not the JSON we expected.
    #[error("malformed response body from {url}: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Creates a transport error, promoting reqwest timeouts to [`ApiError::Timeout`].
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a rate-limited error.
    pub fn rate_limited(url: impl Into<String>, retry_after: Option<String>) -> Self {
        Self::RateLimited {
            url: url.into(),
            retry_after,
        }
    }

    /// Creates an upstream status error.
    pub fn upstream(url: impl Into<String>, status: u16) -> Self {
        Self::Upstream {
            url: url.into(),
            status,
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns the HTTP status associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::RateLimited { .. } | Self::RetryBudgetExhausted { .. } => Some(429),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_timeout_display() {
        let error = ApiError::timeout("https://webexapis.com/v1/rooms");
        let msg = error.to_string();
        assert!(msg.contains("timeout"), "Expected 'timeout' in: {msg}");
        assert!(msg.contains("/v1/rooms"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_api_error_upstream_display_and_status() {
        let error = ApiError::upstream("https://webexapis.com/v1/messages", 503);
        assert!(error.to_string().contains("503"));
        assert_eq!(error.status(), Some(503));
    }

    #[test]
    fn test_api_error_rate_limited_reports_429() {
        let error = ApiError::rate_limited("https://webexapis.com/v1/rooms", None);
        assert!(error.to_string().contains("rate limit"));
        assert_eq!(error.status(), Some(429));
    }

    #[test]
    fn test_api_error_budget_exhausted_display() {
        let error = ApiError::RetryBudgetExhausted {
            url: "https://webexapis.com/v1/rooms".to_string(),
            attempts: 3,
            waited: Duration::from_secs(4),
        };
        let msg = error.to_string();
        assert!(msg.contains("3 attempts"), "Expected attempt count in: {msg}");
    }

    #[test]
    fn test_api_error_decode_display() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = ApiError::decode("https://webexapis.com/v1/rooms", source);
        assert!(error.to_string().contains("malformed"));
        assert_eq!(error.status(), None);
    }
}
