//! Rate-limit signal parsing and the retry budget for throttled requests.
//!
//! The server signals throttling with HTTP 429 and an optional `Retry-After`
//! header. [`parse_retry_after`] turns that header into a [`Duration`], and
//! [`RetryBudget`] decides whether the transport may keep retrying.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use room_export::api::RetryBudget;
//!
//! // Unbounded: every throttled response is retried.
//! let budget = RetryBudget::unbounded();
//! assert!(budget.allows(50, Duration::from_secs(3600)));
//!
//! // Hardened: at most 3 attempts.
//! let budget = RetryBudget::unbounded().with_max_attempts(3);
//! assert!(!budget.allows(3, Duration::ZERO));
//! ```

use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::constants::MAX_RETRY_AFTER;

/// Limits on how long the transport keeps retrying throttled requests.
///
/// Both limits default to `None`, which retries every 429 that carries a
/// usable `Retry-After` hint until the server stops throttling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryBudget {
    /// Maximum number of attempts, including the first request.
    max_attempts: Option<u32>,

    /// Maximum cumulative time spent sleeping on rate-limit hints.
    max_wait: Option<Duration>,
}

impl RetryBudget {
    /// A budget with no limits.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Caps the number of attempts (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Caps the cumulative rate-limit wait.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Returns the configured attempt cap.
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns the configured wait cap.
    #[must_use]
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Whether another attempt may be made.
    ///
    /// `attempts_made` counts requests already sent; `total_wait` includes the
    /// delay about to be slept before the next attempt.
    #[must_use]
    pub fn allows(&self, attempts_made: u32, total_wait: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempts_made >= max) {
            return false;
        }
        if self.max_wait.is_some_and(|max| total_wait > max) {
            return false;
        }
        true
    }
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports two formats as per RFC 7231:
/// - Integer seconds: `Retry-After: 120`
/// - HTTP-date: `Retry-After: Wed, 21 Oct 2025 07:28:00 GMT`
///
/// Returns `None` if the value cannot be parsed. Caps excessive values at 1 hour.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use room_export::api::parse_retry_after;
///
/// assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
/// assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
#[instrument(level = "debug")]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }

        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        return Some(cap_retry_after(duration));
    }

    match httpdate::parse_http_date(header_value) {
        Ok(datetime) => match datetime.duration_since(std::time::SystemTime::now()) {
            Ok(duration) => Some(cap_retry_after(duration)),
            Err(_) => {
                debug!(header_value, "Retry-After date is in the past, returning zero");
                Some(Duration::ZERO)
            }
        },
        Err(_) => {
            debug!(header_value, "unparseable Retry-After value");
            None
        }
    }
}

fn cap_retry_after(duration: Duration) -> Duration {
    if duration > MAX_RETRY_AFTER {
        warn!(
            delay_secs = duration.as_secs(),
            max_secs = MAX_RETRY_AFTER.as_secs(),
            "Retry-After exceeds maximum, capping at 1 hour"
        );
        return MAX_RETRY_AFTER;
    }
    duration
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ==================== RetryBudget Tests ====================

    #[test]
    fn test_unbounded_budget_always_allows() {
        let budget = RetryBudget::unbounded();
        assert!(budget.allows(1, Duration::ZERO));
        assert!(budget.allows(10_000, Duration::from_secs(86_400)));
        assert_eq!(budget.max_attempts(), None);
        assert_eq!(budget.max_wait(), None);
    }

    #[test]
    fn test_budget_max_attempts_counts_first_request() {
        let budget = RetryBudget::unbounded().with_max_attempts(2);
        assert!(budget.allows(1, Duration::ZERO));
        assert!(!budget.allows(2, Duration::ZERO));
    }

    #[test]
    fn test_budget_max_attempts_minimum_is_one() {
        let budget = RetryBudget::unbounded().with_max_attempts(0);
        assert_eq!(budget.max_attempts(), Some(1));
        assert!(!budget.allows(1, Duration::ZERO));
    }

    #[test]
    fn test_budget_max_wait_includes_pending_delay() {
        let budget = RetryBudget::unbounded().with_max_wait(Duration::from_secs(5));
        assert!(budget.allows(1, Duration::from_secs(5)));
        assert!(!budget.allows(1, Duration::from_secs(6)));
    }

    // ==================== parse_retry_after Tests ====================

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 30 "), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_retry_after_negative_is_none() {
        assert_eq!(parse_retry_after("-5"), None);
    }

    #[test]
    fn test_parse_retry_after_garbage_is_none() {
        assert_eq!(parse_retry_after(""), None);
        assert_eq!(parse_retry_after("two seconds"), None);
        assert_eq!(parse_retry_after("1.5"), None);
    }

    #[test]
    fn test_parse_retry_after_caps_at_one_hour() {
        assert_eq!(parse_retry_after("999999"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_parse_retry_after_past_http_date_is_zero() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_parse_retry_after_future_http_date() {
        let future = std::time::SystemTime::now() + Duration::from_secs(120);
        let header = httpdate::fmt_http_date(future);
        let parsed = parse_retry_after(&header).unwrap();
        assert!(parsed <= Duration::from_secs(120));
        assert!(parsed >= Duration::from_secs(100));
    }
}
