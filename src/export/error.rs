//! Error types for the export pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

/// Errors that stop a room export or the whole run.
///
/// Per-file download failures and per-message timestamp problems are not
/// represented here; they are logged and counted in the room summary.
#[derive(Debug, Error)]
pub enum ExportError {
    /// An API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Local disk write or read failed.
    #[error("IO error on {path}: {source}")]
    FileIo {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded as JSON.
    #[error("failed to encode JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The caller-supplied time bound is not RFC 3339.
    #[error("invalid time bound {value:?}: {reason} (expected RFC 3339, e.g. 2024-01-31T00:00:00Z)")]
    InvalidTimeBound {
        /// The rejected value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// The run was interrupted between requests.
    #[error("export cancelled")]
    Cancelled,

    /// The room list file is not a JSON array of rooms.
    #[error("invalid room file {path}: {source}")]
    RoomFile {
        /// The room file.
        path: PathBuf,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl ExportError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Whether the run should stop instead of moving on to the next room.
    ///
    /// API failures only abort the room they happened in; local IO failures,
    /// cancellation and configuration problems abort everything.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Api(api) if !matches!(api, ApiError::Cancelled { .. }))
    }

    /// Whether the run was interrupted, either between requests or while one
    /// was in flight.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Api(ApiError::Cancelled { .. }))
    }
}
