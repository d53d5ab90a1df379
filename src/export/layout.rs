//! Output directory layout.
//!
//! ```text
//! <output>/rooms.json
//! <output>/<title>-<roomId>/messages.json
//! <output>/<title>-<roomId>/content/<filename>
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ExportError;
use crate::api::{FetchedFile, sanitize_filename};
use crate::model::Room;

/// Name of the room index file.
pub const ROOMS_FILE: &str = "rooms.json";

/// Name of each room's message document.
pub const MESSAGES_FILE: &str = "messages.json";

/// Name of each room's attachment directory.
pub const CONTENT_DIR: &str = "content";

/// Replaces `/ \ ? % * : | " < >` with `-`.
///
/// ```
/// use room_export::export::sanitize_title;
///
/// assert_eq!(sanitize_title("Team/Q&A: Planning"), "Team-Q&A- Planning");
/// ```
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '-',
            c => c,
        })
        .collect()
}

/// Directory name for a room: `<sanitized title>-<room id>`.
#[must_use]
pub fn room_dir_name(room: &Room) -> String {
    let title = room.title.as_deref().unwrap_or_default();
    let id = room.id.as_deref().unwrap_or_default();
    sanitize_title(&format!("{title}-{id}"))
}

/// Paths under the export root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The export root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/rooms.json`.
    #[must_use]
    pub fn rooms_path(&self) -> PathBuf {
        self.root.join(ROOMS_FILE)
    }

    /// `<root>/<title>-<id>`.
    #[must_use]
    pub fn room_dir(&self, room: &Room) -> PathBuf {
        self.root.join(room_dir_name(room))
    }

    /// Creates the export root if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::FileIo`] when the directory cannot be created.
    pub async fn ensure_root(&self) -> Result<(), ExportError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ExportError::io(&self.root, e))
    }

    /// Writes `rooms.json` as a pretty-printed array.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] on encode or write failure.
    pub async fn write_rooms(&self, rooms: &[Room]) -> Result<PathBuf, ExportError> {
        let path = self.rooms_path();
        let mut body = serde_json::to_vec_pretty(rooms).map_err(ExportError::Serialize)?;
        body.push(b'\n');
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| ExportError::io(&path, e))?;
        Ok(path)
    }
}

/// Reads a room list previously written as `rooms.json` (or crafted by hand).
///
/// # Errors
///
/// Returns [`ExportError::FileIo`] if unreadable, [`ExportError::RoomFile`] if malformed.
pub async fn read_room_file(path: &Path) -> Result<Vec<Room>, ExportError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExportError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| ExportError::RoomFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a room's attachments under its `content/` directory.
///
/// Names are sanitized and made unique for the lifetime of the store, so two
/// attachments that share a name in one export do not overwrite each other.
#[derive(Debug)]
pub struct ContentStore {
    dir: PathBuf,
    used: HashSet<String>,
}

impl ContentStore {
    /// Store writing into `dir` (which must exist).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            used: HashSet::new(),
        }
    }

    /// Writes the file and returns its reference relative to the room
    /// directory (`./content/<name>`).
    ///
    /// # Errors
    ///
    /// Returns the IO error when the write fails.
    pub async fn persist(&mut self, file: &FetchedFile) -> std::io::Result<String> {
        let name = self.claim_name(&file.name);
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &file.bytes).await?;
        debug!(path = %path.display(), bytes = file.bytes.len(), "saved attachment");
        Ok(format!("./{CONTENT_DIR}/{name}"))
    }

    fn claim_name(&mut self, raw: &str) -> String {
        let name = sanitize_filename(raw);
        if self.used.insert(name.clone()) {
            return name;
        }

        let (stem, ext) = match name.rfind('.') {
            Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
            _ => (name.as_str(), ""),
        };
        let mut suffix = 1usize;
        loop {
            let candidate = format!("{stem}_{suffix}{ext}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_title_replaces_unsafe_chars() {
        let sanitized = sanitize_title("Team/Q&A: Planning");
        assert_eq!(sanitized, "Team-Q&A- Planning");
        for c in ['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'] {
            assert!(!sanitized.contains(c));
        }
    }

    #[test]
    fn test_sanitize_title_every_char() {
        assert_eq!(sanitize_title(r#"a/b\c?d%e*f:g|h"i<j>k"#), "a-b-c-d-e-f-g-h-i-j-k");
    }

    #[test]
    fn test_room_dir_name_joins_title_and_id() {
        let room = Room {
            id: Some("abc123".to_string()),
            title: Some("Ops: On-call".to_string()),
            ..Room::default()
        };
        assert_eq!(room_dir_name(&room), "Ops- On-call-abc123");
    }

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout::new("/tmp/export");
        let room = Room {
            id: Some("r1".to_string()),
            title: Some("General".to_string()),
            ..Room::default()
        };
        assert_eq!(layout.rooms_path(), PathBuf::from("/tmp/export/rooms.json"));
        assert_eq!(layout.room_dir(&room), PathBuf::from("/tmp/export/General-r1"));
    }

    #[tokio::test]
    async fn test_write_then_read_room_file() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let rooms = vec![Room {
            id: Some("r1".to_string()),
            title: Some("General".to_string()),
            is_locked: true,
            ..Room::default()
        }];

        let path = layout.write_rooms(&rooms).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"), "expected two-space indent: {text}");
        assert!(text.ends_with("]\n"));

        let loaded = read_room_file(&path).await.unwrap();
        assert_eq!(loaded, rooms);
    }

    #[tokio::test]
    async fn test_read_room_file_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rooms.json");
        std::fs::write(&path, b"{\"not\": \"a list\"}").unwrap();
        assert!(matches!(
            read_room_file(&path).await,
            Err(ExportError::RoomFile { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_room_file_missing_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = read_room_file(&temp.path().join("absent.json")).await;
        assert!(matches!(result, Err(ExportError::FileIo { .. })));
    }

    #[tokio::test]
    async fn test_content_store_deduplicates_names() {
        let temp = TempDir::new().unwrap();
        let mut store = ContentStore::new(temp.path());
        let file = |bytes: &[u8]| FetchedFile {
            name: "image.png".to_string(),
            bytes: bytes.to_vec(),
        };

        assert_eq!(store.persist(&file(b"one")).await.unwrap(), "./content/image.png");
        assert_eq!(store.persist(&file(b"two")).await.unwrap(), "./content/image_1.png");
        assert_eq!(std::fs::read(temp.path().join("image.png")).unwrap(), b"one");
        assert_eq!(std::fs::read(temp.path().join("image_1.png")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_content_store_sanitizes_traversal() {
        let temp = TempDir::new().unwrap();
        let mut store = ContentStore::new(temp.path());
        let reference = store
            .persist(&FetchedFile {
                name: "../../etc/passwd".to_string(),
                bytes: b"x".to_vec(),
            })
            .await
            .unwrap();
        assert_eq!(reference, "./content/.._.._etc_passwd");
        assert!(temp.path().join(".._.._etc_passwd").exists());
    }
}
