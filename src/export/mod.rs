//! Export pipeline: rooms and messages to disk.
//!
//! - [`writer`] streams `{"messages": [...]}` documents record by record
//! - [`RoomExporter`] drives message pages, time bounds and attachments
//! - [`run`] lists rooms, writes `rooms.json`, and exports each room
//! - [`layout`] names the files and directories

mod error;
pub mod layout;
mod room;
mod run;
pub mod writer;

pub use error::ExportError;
pub use layout::{ContentStore, OutputLayout, read_room_file, room_dir_name, sanitize_title};
pub use room::{ExportOptions, RoomExportSummary, RoomExporter, parse_time_bound};
pub use run::{RunOptions, RunSummary, run};
pub use writer::MessageStreamWriter;
