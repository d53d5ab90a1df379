//! Room and message records as returned by the API and written to disk.
//!
//! Field names follow the API's camelCase JSON. Absent strings, empty lists and
//! `false` flags are omitted on output, so a record round-trips to the same
//! shape the server sent (minus fields we do not model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// A room (space) visible to the authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_read_only: bool,
}

impl Room {
    /// Parsed `lastActivity`, or `None` when absent or not RFC 3339.
    #[must_use]
    pub fn last_activity_time(&self) -> Option<DateTime<Utc>> {
        self.last_activity.as_deref().and_then(|s| parse_rfc3339(s).ok())
    }
}

/// A single message in a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Thread parent, when this message is a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Attachment URLs; rewritten to `./content/<name>` once downloaded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_people: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_voice_clip: bool,
}

/// Why a message has no usable effective timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    /// Neither `updated` nor `created` is set.
    #[error("message has no created or updated time")]
    Missing,
    /// The chosen field is not RFC 3339.
    #[error("invalid message time {value:?}: {reason}")]
    Invalid {
        /// The raw value.
        value: String,
        /// Parser message.
        reason: String,
    },
}

impl Message {
    /// `updated` when set, otherwise `created`.
    #[must_use]
    pub fn effective_time_raw(&self) -> Option<&str> {
        self.updated
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.created.as_deref().filter(|s| !s.is_empty()))
    }

    /// Parsed effective timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] when no time is present or it does not parse.
    pub fn effective_time(&self) -> Result<DateTime<Utc>, TimestampError> {
        let raw = self.effective_time_raw().ok_or(TimestampError::Missing)?;
        parse_rfc3339(raw).map_err(|e| TimestampError::Invalid {
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }

    /// Returns this message with its file references replaced.
    #[must_use]
    pub fn with_files(self, files: Vec<String>) -> Self {
        Self { files, ..self }
    }
}

/// Envelope used by list endpoints: `{"items": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Parses an RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns the chrono parse error for malformed input.
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value.trim()).map(|dt| dt.with_timezone(&Utc))
}
