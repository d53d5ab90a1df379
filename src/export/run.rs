//! Whole-run orchestration: rooms listing, `rooms.json`, then each room in turn.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::layout::{OutputLayout, read_room_file};
use super::room::{ExportOptions, RoomExporter};
use super::ExportError;
use crate::api::ApiClient;
use crate::api::constants::DEFAULT_MAX_ROOMS;
use crate::model::Room;

/// Inputs for [`run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Export root.
    pub output_dir: PathBuf,
    /// Rooms requested from the listing call.
    pub max_rooms: u32,
    /// Pre-supplied room list; bypasses the listing call.
    pub room_file: Option<PathBuf>,
    /// Stop after writing `rooms.json`.
    pub rooms_only: bool,
    /// Per-room export settings.
    pub export: ExportOptions,
}

impl RunOptions {
    /// Options with defaults for everything but the output directory.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_rooms: DEFAULT_MAX_ROOMS,
            room_file: None,
            rooms_only: false,
            export: ExportOptions::default(),
        }
    }
}

/// Totals across a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rooms listed or loaded.
    pub rooms: usize,
    /// Rooms whose export completed.
    pub rooms_exported: usize,
    /// Rooms skipped (no id, or no activity after the lower bound).
    pub rooms_skipped: usize,
    /// Rooms whose export stopped on an API error.
    pub rooms_failed: usize,
    /// Messages written across rooms.
    pub messages_written: usize,
    /// Messages dropped for a missing or unparseable timestamp.
    pub messages_skipped: usize,
    /// Attachments saved across rooms.
    pub files_downloaded: usize,
    /// Attachments left remote across rooms.
    pub files_failed: usize,
}

/// Lists (or loads) rooms, writes `rooms.json`, and exports each room.
///
/// API failures inside one room are logged and the run moves on; local IO
/// failures and cancellation abort the run. The client's cancellation token,
/// if any, is checked between rooms, pages, records and files.
///
/// # Errors
///
/// Returns [`ExportError`] if rooms cannot be obtained or a fatal error occurs.
#[instrument(skip_all, fields(output = %options.output_dir.display()))]
pub async fn run(client: &ApiClient, options: &RunOptions) -> Result<RunSummary, ExportError> {
    let rooms = match &options.room_file {
        Some(path) => {
            info!(path = %path.display(), "reading rooms from file");
            read_room_file(path).await?
        }
        None => {
            info!(max = options.max_rooms, "fetching rooms");
            client.list_rooms(options.max_rooms).await?
        }
    };

    for room in &rooms {
        info!(
            id = room.id.as_deref().unwrap_or_default(),
            title = room.title.as_deref().unwrap_or_default(),
            last_activity = room.last_activity.as_deref().unwrap_or_default(),
            "room"
        );
    }

    let layout = OutputLayout::new(&options.output_dir);
    layout.ensure_root().await?;
    let rooms_path = layout.write_rooms(&rooms).await?;
    info!(path = %rooms_path.display(), "rooms saved");

    let mut summary = RunSummary {
        rooms: rooms.len(),
        ..RunSummary::default()
    };

    if options.rooms_only {
        info!("only rooms were requested, exiting");
        return Ok(summary);
    }

    let cancel = client.cancellation().cloned();
    let mut exporter = RoomExporter::new(client, client, options.export.clone());
    if let Some(token) = &cancel {
        exporter = exporter.with_cancellation(token.clone());
    }

    for room in &rooms {
        if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            warn!(exported = summary.rooms_exported, "run cancelled");
            return Err(ExportError::Cancelled);
        }

        let Some(room_id) = room.id.as_deref().filter(|id| !id.is_empty()) else {
            warn!(title = ?room.title, "room has no id, skipping");
            summary.rooms_skipped += 1;
            continue;
        };

        if is_inactive_since(room, &options.export) {
            info!(room_id, title = ?room.title, "room has no activity after the lower bound, skipping");
            summary.rooms_skipped += 1;
            continue;
        }

        let room_dir = layout.room_dir(room);
        info!(room_id, dir = %room_dir.display(), "exporting room");
        match exporter.export_room(room_id, &room_dir).await {
            Ok(room_summary) => {
                summary.rooms_exported += 1;
                summary.messages_written += room_summary.messages_written;
                summary.messages_skipped += room_summary.messages_skipped;
                summary.files_downloaded += room_summary.files_downloaded;
                summary.files_failed += room_summary.files_failed;
            }
            Err(err) if !err.is_fatal() => {
                error!(room_id, error = %err, "room export failed, continuing with next room");
                summary.rooms_failed += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(summary)
}

/// A room whose last activity precedes the lower bound has nothing to export.
///
/// Rooms without a parseable `lastActivity` are always exported.
fn is_inactive_since(room: &Room, export: &ExportOptions) -> bool {
    match (export.after, room.last_activity_time()) {
        (Some(bound), Some(last_activity)) => last_activity < bound,
        _ => false,
    }
}
