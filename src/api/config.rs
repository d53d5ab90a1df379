//! Client configuration: credential, base URL, timeouts, and retry budget.
//!
//! The bearer token is read once (by the binary) and carried here as an
//! explicit value, so tests can point a client at a mock server with a fake
//! token.

use std::fmt;
use std::time::Duration;

use super::constants::{
    BASE_URL_ENV_VAR, CONNECT_TIMEOUT, DEFAULT_BASE_URL, FILE_TIMEOUT, METADATA_TIMEOUT,
    TOKEN_ENV_VAR,
};
use super::rate_limit::RetryBudget;

/// Errors loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The credential variable is unset or blank.
    #[error("{var} is not set; export a bearer token to access the API")]
    MissingToken {
        /// Name of the variable that was checked.
        var: &'static str,
    },
}

/// Connection settings for [`ApiClient`](super::ApiClient).
#[derive(Clone)]
pub struct ApiConfig {
    base_url: String,
    token: String,
    connect_timeout: Duration,
    metadata_timeout: Duration,
    file_timeout: Duration,
    retry_budget: RetryBudget,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("metadata_timeout", &self.metadata_timeout)
            .field("file_timeout", &self.file_timeout)
            .field("retry_budget", &self.retry_budget)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Creates a configuration for the default API host.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            connect_timeout: CONNECT_TIMEOUT,
            metadata_timeout: METADATA_TIMEOUT,
            file_timeout: FILE_TIMEOUT,
            retry_budget: RetryBudget::unbounded(),
        }
    }

    /// Reads the token (and optional base URL override) from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] when the token variable is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingToken { var: TOKEN_ENV_VAR })?;

        let mut config = Self::new(token);
        if let Some(base_url) = std::env::var(BASE_URL_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    /// Overrides the API base URL (trailing slashes are dropped).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the per-request timeouts for metadata calls and file bodies.
    #[must_use]
    pub fn with_timeouts(mut self, metadata: Duration, file: Duration) -> Self {
        self.metadata_timeout = metadata;
        self.file_timeout = file;
        self
    }

    /// Sets the rate-limit retry budget.
    #[must_use]
    pub fn with_retry_budget(mut self, retry_budget: RetryBudget) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// API base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Timeout applied to rooms and messages requests.
    #[must_use]
    pub fn metadata_timeout(&self) -> Duration {
        self.metadata_timeout
    }

    /// Timeout applied to file downloads.
    #[must_use]
    pub fn file_timeout(&self) -> Duration {
        self.file_timeout
    }

    /// The configured retry budget.
    #[must_use]
    pub fn retry_budget(&self) -> RetryBudget {
        self.retry_budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_host_and_timeouts() {
        let config = ApiConfig::new("secret");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.metadata_timeout(), Duration::from_secs(30));
        assert_eq!(config.file_timeout(), Duration::from_secs(600));
        assert_eq!(config.retry_budget(), RetryBudget::unbounded());
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let config = ApiConfig::new("secret").with_base_url("http://127.0.0.1:8080/");
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ApiConfig::new("super-secret-token");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}
