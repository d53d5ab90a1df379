//! Room Export Library
//!
//! Exports rooms, messages and attached files from a messaging REST API
//! (Webex-compatible `/v1/rooms` and `/v1/messages`) to local JSON documents
//! and content directories.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`api`] - Authenticated client with rate-limit retry, paging and file fetch
//! - [`model`] - Room and message records
//! - [`export`] - Streaming `messages.json` writer, per-room exporter, run loop

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod export;
pub mod model;
mod user_agent;

// Re-export commonly used types
pub use api::{ApiClient, ApiConfig, ApiError, MessageQuery, RetryBudget};
pub use export::{ExportError, ExportOptions, MessageStreamWriter, RunOptions, RunSummary, run};
pub use model::{Message, Room};
