//! Incremental writer for `{"messages": [...]}` documents.
//!
//! Records are encoded one at a time and pushed to the sink, so memory use is
//! bounded by the largest single message rather than the room's history.
//!
//! # Example
//!
//! ```
//! use room_export::export::MessageStreamWriter;
//! use room_export::model::Message;
//!
//! # async fn example() -> Result<(), room_export::export::ExportError> {
//! let mut writer = MessageStreamWriter::open(Vec::new(), "<memory>").await?;
//! writer.write_message(&Message::default()).await?;
//! let bytes = writer.finish().await?;
//! let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
//! assert_eq!(doc["messages"].as_array().map(Vec::len), Some(1));
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use super::ExportError;
use crate::model::Message;

const DOCUMENT_OPEN: &[u8] = b"{\n  \"messages\": [\n";
const DOCUMENT_CLOSE: &[u8] = b"  ]\n}\n";
const RECORD_INDENT: &str = "    ";

/// Streams messages into a JSON document.
///
/// [`finish`](Self::finish) writes the closing tokens; every caller path that
/// opened a writer must call it, including early termination, or the document
/// is left unterminated.
#[derive(Debug)]
pub struct MessageStreamWriter<W> {
    sink: W,
    label: PathBuf,
    written: usize,
}

impl MessageStreamWriter<BufWriter<File>> {
    /// Creates (truncating) the file at `path` and writes the document header.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::FileIo`] if the file cannot be created or written.
    pub async fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)
            .await
            .map_err(|e| ExportError::io(path, e))?;
        Self::open(BufWriter::new(file), path).await
    }
}

impl<W: AsyncWrite + Unpin> MessageStreamWriter<W> {
    /// Wraps `sink` and writes the document header.
    ///
    /// `label` names the sink in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::FileIo`] if the header cannot be written.
    pub async fn open(sink: W, label: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let mut writer = Self {
            sink,
            label: label.into(),
            written: 0,
        };
        writer.put(DOCUMENT_OPEN).await?;
        Ok(writer)
    }

    /// Appends one record, preceded by a separator unless it is the first.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] on encode or write failure.
    pub async fn write_message(&mut self, message: &Message) -> Result<(), ExportError> {
        let encoded = serde_json::to_string_pretty(message).map_err(ExportError::Serialize)?;

        let mut chunk = String::with_capacity(encoded.len() + 64);
        if self.written > 0 {
            chunk.push_str(",\n");
        }
        for (i, line) in encoded.lines().enumerate() {
            if i > 0 {
                chunk.push('\n');
            }
            chunk.push_str(RECORD_INDENT);
            chunk.push_str(line);
        }

        self.put(chunk.as_bytes()).await?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Writes the closing tokens, flushes, and hands back the sink.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::FileIo`] if the footer cannot be written or flushed.
    pub async fn finish(mut self) -> Result<W, ExportError> {
        if self.written > 0 {
            self.put(b"\n").await?;
        }
        self.put(DOCUMENT_CLOSE).await?;
        self.sink
            .flush()
            .await
            .map_err(|e| ExportError::io(&self.label, e))?;
        Ok(self.sink)
    }

    async fn put(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        self.sink
            .write_all(bytes)
            .await
            .map_err(|e| ExportError::io(&self.label, e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn message(id: &str, text: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            text: Some(text.to_string()),
            created: Some("2024-01-01T00:00:00Z".to_string()),
            ..Message::default()
        }
    }

    async fn render(messages: &[Message]) -> String {
        let mut writer = MessageStreamWriter::open(Vec::new(), "<memory>").await.unwrap();
        for m in messages {
            writer.write_message(m).await.unwrap();
        }
        String::from_utf8(writer.finish().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_document_is_valid() {
        let text = render(&[]).await;
        assert_eq!(text, "{\n  \"messages\": [\n  ]\n}\n");
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["messages"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_records_keep_order_and_parse_back() {
        let messages = vec![message("3", "newest"), message("2", "middle"), message("1", "oldest")];
        let text = render(&messages).await;

        let doc: Value = serde_json::from_str(&text).unwrap();
        let ids: Vec<&str> = doc["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["3", "2", "1"]);

        let decoded: Vec<Message> = serde_json::from_value(doc["messages"].clone()).unwrap();
        assert_eq!(decoded, messages);
    }

    #[tokio::test]
    async fn test_no_trailing_comma() {
        let text = render(&[message("2", "a"), message("1", "b")]).await;
        assert!(!text.contains(",\n  ]"), "trailing comma in: {text}");
        assert_eq!(text.matches("},\n").count(), 1);
    }

    #[tokio::test]
    async fn test_records_are_indented_inside_array() {
        let text = render(&[message("1", "hi")]).await;
        assert!(text.contains("\n    {\n      \"id\": \"1\""), "unexpected layout: {text}");
    }

    #[tokio::test]
    async fn test_written_counts_records() {
        let mut writer = MessageStreamWriter::open(Vec::new(), "<memory>").await.unwrap();
        assert_eq!(writer.written(), 0);
        writer.write_message(&message("1", "x")).await.unwrap();
        writer.write_message(&message("2", "y")).await.unwrap();
        assert_eq!(writer.written(), 2);
    }

    #[tokio::test]
    async fn test_create_writes_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("messages.json");
        let mut writer = MessageStreamWriter::create(&path).await.unwrap();
        writer.write_message(&message("1", "on disk")).await.unwrap();
        writer.finish().await.unwrap();

        let doc: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc["messages"][0]["text"], "on disk");
    }

    #[tokio::test]
    async fn test_create_in_missing_dir_is_io_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("missing").join("messages.json");
        let result = MessageStreamWriter::create(&path).await;
        assert!(matches!(result, Err(ExportError::FileIo { .. })));
    }
}
