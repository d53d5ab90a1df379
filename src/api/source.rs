//! Seams between the exporter and the network.
//!
//! [`ApiClient`](super::ApiClient) implements both traits; tests can supply
//! in-memory sources instead.

use async_trait::async_trait;

use super::ApiError;
use crate::model::Message;

/// Query for one page of messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    /// Room to list.
    pub room_id: String,
    /// Requested page size (`max`).
    pub page_size: u32,
    /// Cursor: only messages older than this message id (`beforeMessage`).
    pub before_message: Option<String>,
    /// Absolute upper time bound, RFC 3339 (`before`).
    pub before: Option<String>,
}

impl MessageQuery {
    /// First page for a room.
    #[must_use]
    pub fn first_page(room_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            room_id: room_id.into(),
            page_size,
            before_message: None,
            before: None,
        }
    }

    /// Sets the absolute upper time bound.
    #[must_use]
    pub fn with_before(mut self, before: Option<String>) -> Self {
        self.before = before;
        self
    }

    /// Query for the page that follows `page`, or `None` when pagination is done.
    ///
    /// A page shorter than the requested size is the last one. A full page whose
    /// last message carries no id cannot be continued.
    #[must_use]
    pub fn next_page(&self, page: &[Message]) -> Option<Self> {
        if page.is_empty() || page.len() < self.page_size as usize {
            return None;
        }
        let cursor = page.last().and_then(|m| m.id.clone())?;
        Some(Self {
            before_message: Some(cursor),
            ..self.clone()
        })
    }
}

/// A downloaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Name derived from headers or URL (not yet sanitized for disk).
    pub name: String,
    /// Raw body.
    pub bytes: Vec<u8>,
}

/// Anything that can list message pages.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetches one page of messages, newest first.
    async fn list_messages(&self, query: &MessageQuery) -> Result<Vec<Message>, ApiError>;
}

/// Anything that can fetch an attachment by URL.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Downloads one file.
    async fn fetch_file(&self, url: &str) -> Result<FetchedFile, ApiError>;
}
