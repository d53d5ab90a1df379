//! Client for the messaging REST API.
//!
//! # Features
//!
//! - Bearer authentication from explicit [`ApiConfig`]
//! - Per-request timeouts (30s metadata, 10 minutes for file bodies)
//! - Transparent retry of HTTP 429 responses carrying `Retry-After`, bounded by
//!   an injectable [`RetryBudget`] and an optional cancellation token
//! - Stateless message paging driven by [`MessageQuery::next_page`]
//! - Attachment filename derivation from `Content-Disposition`, URL and
//!   `Content-Type`

mod client;
mod config;
pub mod constants;
mod error;
mod filename;
mod rate_limit;
mod source;

pub use client::ApiClient;
pub use config::{ApiConfig, ConfigError};
pub use error::ApiError;
pub use filename::{resolve_file_name, sanitize_filename};
pub use rate_limit::{RetryBudget, parse_retry_after};
pub use source::{FetchedFile, FileSource, MessageQuery, MessageSource};
