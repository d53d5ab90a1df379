//! Authenticated API client with rate-limit-aware request execution.
//!
//! Every request carries the bearer token and a per-request timeout (30s for
//! rooms/messages, 10 minutes for file bodies). HTTP 429 responses with a usable
//! `Retry-After` hint are slept on and re-issued; the loop is bounded only by
//! the configured [`RetryBudget`](super::RetryBudget). An attached
//! cancellation token cuts short any in-flight send, body read or rate-limit
//! sleep with [`ApiError::Cancelled`].
//!
//! # Example
//!
//! ```no_run
//! use room_export::api::{ApiClient, ApiConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(ApiConfig::from_env()?)?;
//! let rooms = client.list_rooms(10).await?;
//! println!("{} rooms", rooms.len());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::config::ApiConfig;
use super::error::ApiError;
use super::filename::resolve_file_name;
use super::rate_limit::parse_retry_after;
use super::source::{FetchedFile, FileSource, MessageQuery, MessageSource};
use crate::model::{ItemsResponse, Message, Room};
use crate::user_agent;

/// Client for the rooms, messages and file endpoints.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    cancel: Option<CancellationToken>,
}

impl ApiClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the underlying HTTP client fails to build.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| ApiError::Client { source })?;
        debug!(base_url = config.base_url(), "API client ready");
        Ok(Self {
            client,
            config,
            cancel: None,
        })
    }

    /// Attaches a token that aborts in-flight requests and rate-limit waits
    /// when cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The attached cancellation token, if any.
    #[must_use]
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    /// The client's configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Lists up to `max_rooms` rooms, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status, rate-limit or decode failure.
    #[instrument(skip(self))]
    pub async fn list_rooms(&self, max_rooms: u32) -> Result<Vec<Room>, ApiError> {
        let mut url = self.endpoint("/v1/rooms")?;
        url.query_pairs_mut()
            .append_pair("max", &max_rooms.to_string())
            .append_pair("sortBy", "lastactivity");

        let page: ItemsResponse<Room> = self.get_json(&url).await?;
        info!(count = page.items.len(), "fetched rooms");
        Ok(page.items)
    }

    /// Fetches one page of messages for a room, newest first.
    ///
    /// The client keeps no cursor state; use [`MessageQuery::next_page`] to
    /// build the follow-up query.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status, rate-limit or decode failure.
    #[instrument(skip(self), fields(room_id = %query.room_id, cursor = ?query.before_message))]
    pub async fn list_messages(&self, query: &MessageQuery) -> Result<Vec<Message>, ApiError> {
        let mut url = self.endpoint("/v1/messages")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("roomId", &query.room_id)
                .append_pair("max", &query.page_size.to_string());
            if let Some(cursor) = &query.before_message {
                pairs.append_pair("beforeMessage", cursor);
            }
            if let Some(before) = &query.before {
                pairs.append_pair("before", before);
            }
        }

        let page: ItemsResponse<Message> = self.get_json(&url).await?;
        debug!(count = page.items.len(), "fetched message page");
        Ok(page.items)
    }

    /// Downloads a file and derives its name from the response.
    ///
    /// Does not touch the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on invalid URL, transport, status or rate-limit failure.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_file(&self, url: &str) -> Result<FetchedFile, ApiError> {
        let parsed = Url::parse(url).map_err(|_| ApiError::invalid_url(url))?;
        let response = self.execute(&parsed, self.config.file_timeout()).await?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let disposition = header(CONTENT_DISPOSITION);
        let content_type = header(CONTENT_TYPE);
        let name = resolve_file_name(url, disposition.as_deref(), content_type.as_deref());

        let bytes = self
            .cancellable(url, async {
                response.bytes().await.map_err(|e| ApiError::transport(url, e))
            })
            .await?
            .to_vec();
        debug!(name = %name, bytes = bytes.len(), "fetched file");
        Ok(FetchedFile { name, bytes })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{path}", self.config.base_url());
        Url::parse(&raw).map_err(|_| ApiError::invalid_url(raw))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let response = self.execute(url, self.config.metadata_timeout()).await?;
        let body = self
            .cancellable(url.as_str(), async {
                response
                    .bytes()
                    .await
                    .map_err(|e| ApiError::transport(url.as_str(), e))
            })
            .await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::decode(url.as_str(), e))
    }

    /// Sends a GET, sleeping and re-issuing it on every 429 that carries a
    /// parseable `Retry-After`, until success, a hard failure, or the budget
    /// runs out.
    async fn execute(&self, url: &Url, timeout: Duration) -> Result<reqwest::Response, ApiError> {
        let budget = self.config.retry_budget();
        let mut attempts: u32 = 0;
        let mut waited = Duration::ZERO;

        loop {
            attempts += 1;
            let request = self
                .client
                .get(url.clone())
                .bearer_auth(self.config.token())
                .timeout(timeout);
            let response = self
                .cancellable(url.as_str(), async {
                    request
                        .send()
                        .await
                        .map_err(|e| ApiError::transport(url.as_str(), e))
                })
                .await?;

            let status = response.status();
            if status == StatusCode::OK {
                return Ok(response);
            }
            if status != StatusCode::TOO_MANY_REQUESTS {
                return Err(ApiError::upstream(url.as_str(), status.as_u16()));
            }

            let raw = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let Some(delay) = raw.as_deref().and_then(parse_retry_after) else {
                warn!(url = %url, retry_after = ?raw, "rate limited without usable Retry-After");
                return Err(ApiError::rate_limited(url.as_str(), raw));
            };

            let total = waited + delay;
            if !budget.allows(attempts, total) {
                return Err(ApiError::RetryBudgetExhausted {
                    url: url.to_string(),
                    attempts,
                    waited,
                });
            }

            warn!(
                url = %url,
                delay_secs = delay.as_secs_f64(),
                attempt = attempts,
                "rate limit exceeded, retrying"
            );
            self.wait(url, delay).await?;
            waited = total;
        }
    }

    async fn wait(&self, url: &Url, delay: Duration) -> Result<(), ApiError> {
        self.cancellable(url.as_str(), async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }

    /// Runs `work` unless the cancellation token fires first.
    async fn cancellable<T>(
        &self,
        url: &str,
        work: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        let Some(token) = &self.cancel else {
            return work.await;
        };
        tokio::select! {
            biased;
            () = token.cancelled() => Err(ApiError::cancelled(url)),
            result = work => result,
        }
    }
}

#[async_trait]
impl MessageSource for ApiClient {
    async fn list_messages(&self, query: &MessageQuery) -> Result<Vec<Message>, ApiError> {
        ApiClient::list_messages(self, query).await
    }
}

#[async_trait]
impl FileSource for ApiClient {
    async fn fetch_file(&self, url: &str) -> Result<FetchedFile, ApiError> {
        ApiClient::fetch_file(self, url).await
    }
}
