//! Per-room export: pages of messages in, one `messages.json` out.
//!
//! The exporter owns the pagination cursor, applies the lower time bound,
//! downloads attachments into the room's content directory, and streams each
//! record into a [`MessageStreamWriter`].

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::layout::{CONTENT_DIR, ContentStore, MESSAGES_FILE};
use super::writer::MessageStreamWriter;
use super::ExportError;
use crate::api::constants::DEFAULT_PAGE_SIZE;
use crate::api::{ApiError, FileSource, MessageQuery, MessageSource};
use crate::model::{Message, parse_rfc3339};

/// Knobs for a room export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Messages per page request.
    pub page_size: u32,
    /// Lower bound: stop at the first message at or before this instant.
    pub after: Option<DateTime<Utc>>,
    /// Upper bound sent to the API as `before` (RFC 3339).
    pub before: Option<String>,
    /// Whether attachments are downloaded and references rewritten.
    pub download_files: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            after: None,
            before: None,
            download_files: true,
        }
    }
}

/// Parses a caller-supplied RFC 3339 time bound.
///
/// # Errors
///
/// Returns [`ExportError::InvalidTimeBound`] for anything chrono rejects.
pub fn parse_time_bound(value: &str) -> Result<DateTime<Utc>, ExportError> {
    parse_rfc3339(value).map_err(|e| ExportError::InvalidTimeBound {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// What happened during one room export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomExportSummary {
    /// Page requests made.
    pub pages: usize,
    /// Records written to `messages.json`.
    pub messages_written: usize,
    /// Records dropped for a missing or unparseable timestamp.
    pub messages_skipped: usize,
    /// Attachments saved to disk.
    pub files_downloaded: usize,
    /// Attachments left pointing at their remote URL.
    pub files_failed: usize,
    /// Whether the lower time bound ended the export.
    pub reached_time_bound: bool,
}

enum Admission {
    Write,
    Skip,
    Stop,
}

/// Exports rooms using a message source and a file source.
pub struct RoomExporter<'a> {
    messages: &'a dyn MessageSource,
    files: &'a dyn FileSource,
    options: ExportOptions,
    cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for RoomExporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomExporter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> RoomExporter<'a> {
    /// Creates an exporter.
    #[must_use]
    pub fn new(
        messages: &'a dyn MessageSource,
        files: &'a dyn FileSource,
        options: ExportOptions,
    ) -> Self {
        Self {
            messages,
            files,
            options,
            cancel: None,
        }
    }

    /// Stops the export between pages, records and files once `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The exporter's options.
    #[must_use]
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Exports one room into `room_dir` (`messages.json` plus `content/`).
    ///
    /// Nothing is written when the first page cannot be fetched. Once the
    /// document is open it is always closed, even when a later page fetch
    /// fails, so what was written stays parseable; the error is then returned.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] on page fetch failure, disk failure, or cancellation.
    #[instrument(skip(self, room_dir), fields(room_dir = %room_dir.display()))]
    pub async fn export_room(
        &self,
        room_id: &str,
        room_dir: &Path,
    ) -> Result<RoomExportSummary, ExportError> {
        let mut summary = RoomExportSummary::default();
        let query = self.first_query(room_id);
        let page = self.fetch_page(&query, &mut summary).await?;

        let content_dir = room_dir.join(CONTENT_DIR);
        tokio::fs::create_dir_all(&content_dir)
            .await
            .map_err(|e| ExportError::io(&content_dir, e))?;

        let messages_path = room_dir.join(MESSAGES_FILE);
        let mut writer = MessageStreamWriter::create(&messages_path).await?;
        let mut store = ContentStore::new(content_dir);

        let streamed = self
            .stream_pages(query, page, &mut writer, &mut store, &mut summary)
            .await;
        let finished = writer.finish().await;

        match (streamed, finished) {
            (Err(error), finished) => {
                if let Err(close_error) = finished {
                    warn!(error = %close_error, "failed to close messages document");
                }
                Err(error)
            }
            (Ok(()), Err(error)) => Err(error),
            (Ok(()), Ok(_)) => {
                info!(
                    path = %messages_path.display(),
                    messages = summary.messages_written,
                    skipped = summary.messages_skipped,
                    files = summary.files_downloaded,
                    files_failed = summary.files_failed,
                    "room exported"
                );
                Ok(summary)
            }
        }
    }

    /// Query for the newest page of `room_id`, carrying the upper bound.
    #[must_use]
    pub fn first_query(&self, room_id: &str) -> MessageQuery {
        MessageQuery::first_page(room_id, self.options.page_size)
            .with_before(self.options.before.clone())
    }

    /// Fetches one page and counts it in `summary`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] on fetch failure or cancellation.
    pub async fn fetch_page(
        &self,
        query: &MessageQuery,
        summary: &mut RoomExportSummary,
    ) -> Result<Vec<Message>, ExportError> {
        self.ensure_active()?;
        let page = self.messages.list_messages(query).await?;
        summary.pages += 1;
        debug!(page = summary.pages, count = page.len(), "fetched page");
        Ok(page)
    }

    /// Streams `page`, already fetched for `query`, and every older page
    /// after it into `writer`.
    ///
    /// Generic over the sink so the page/bound logic can run against memory.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] on page fetch failure, write failure, or cancellation.
    pub async fn stream_pages<W>(
        &self,
        mut query: MessageQuery,
        mut page: Vec<Message>,
        writer: &mut MessageStreamWriter<W>,
        store: &mut ContentStore,
        summary: &mut RoomExportSummary,
    ) -> Result<(), ExportError>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        loop {
            let next = query.next_page(&page);
            if next.is_none() && !page.is_empty() && page.len() == query.page_size as usize {
                warn!("full page ends with a message without id; stopping pagination");
            }

            for message in page {
                self.ensure_active()?;
                match self.admit(&message) {
                    Admission::Skip => {
                        summary.messages_skipped += 1;
                        continue;
                    }
                    Admission::Stop => {
                        debug!(id = ?message.id, "reached lower time bound");
                        summary.reached_time_bound = true;
                        return Ok(());
                    }
                    Admission::Write => {}
                }

                let message = if self.options.download_files && !message.files.is_empty() {
                    self.localize_files(message, store, summary).await?
                } else {
                    message
                };

                writer.write_message(&message).await?;
                summary.messages_written += 1;
            }

            let Some(next) = next else {
                return Ok(());
            };
            page = self.fetch_page(&next, summary).await?;
            query = next;
        }
    }

    fn ensure_active(&self) -> Result<(), ExportError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ExportError::Cancelled),
            _ => Ok(()),
        }
    }

    fn admit(&self, message: &Message) -> Admission {
        let time = match message.effective_time() {
            Ok(time) => time,
            Err(error) => {
                warn!(id = ?message.id, %error, "skipping message");
                return Admission::Skip;
            }
        };
        match self.options.after {
            Some(bound) if time <= bound => Admission::Stop,
            _ => Admission::Write,
        }
    }

    /// Downloads each attachment and returns the message with local references.
    ///
    /// A failed download or write keeps that entry's remote URL.
    async fn localize_files(
        &self,
        message: Message,
        store: &mut ContentStore,
        summary: &mut RoomExportSummary,
    ) -> Result<Message, ExportError> {
        let mut files = Vec::with_capacity(message.files.len());

        for url in &message.files {
            self.ensure_active()?;
            debug!(url = %url, "downloading file");
            let fetched = match self.files.fetch_file(url).await {
                Ok(fetched) => fetched,
                Err(error @ ApiError::Cancelled { .. }) => return Err(error.into()),
                Err(error) => {
                    warn!(url = %url, %error, "file download failed, keeping remote reference");
                    summary.files_failed += 1;
                    files.push(url.clone());
                    continue;
                }
            };

            match store.persist(&fetched).await {
                Ok(reference) => {
                    info!(name = %fetched.name, bytes = fetched.bytes.len(), "file saved");
                    summary.files_downloaded += 1;
                    files.push(reference);
                }
                Err(error) => {
                    warn!(url = %url, name = %fetched.name, %error, "writing file failed, keeping remote reference");
                    summary.files_failed += 1;
                    files.push(url.clone());
                }
            }
        }

        Ok(message.with_files(files))
    }
}
