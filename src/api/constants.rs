//! Constants for the API client (endpoints, timeouts, rate limiting).

use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://webexapis.com";

/// Environment variable holding the bearer token.
pub const TOKEN_ENV_VAR: &str = "WEBEX_APIKEY";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV_VAR: &str = "WEBEX_API_BASE_URL";

/// HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout for rooms/messages calls (30 seconds).
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout for file bodies (10 minutes).
pub const FILE_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum Retry-After header value (1 hour) to prevent excessive delays.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Default page size for message listing.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default number of rooms requested.
pub const DEFAULT_MAX_ROOMS: u32 = 100;
