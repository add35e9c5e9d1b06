/// Local filesystem storage backend.
///
/// Boards, cards and descriptions live in a plain directory tree (see
/// `StorageLayout`). There is no in-process locking: every operation is an
/// independent read-modify-write and the last writer wins. Single files are
/// replaced atomically (write to a temp file, fsync, rename); nothing spans
/// more than one file atomically.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::files::FileTree;
use super::layout::{check_segment, StorageLayout};
use super::StorageError;

/// Filesystem-backed board, card and description storage.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    layout: StorageLayout,
}

impl LocalStorage {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Create the boards and uploads roots under `data_dir` if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let layout = StorageLayout::new(data_dir);
        fs::create_dir_all(layout.boards_root())?;
        fs::create_dir_all(layout.uploads_root())?;
        log::info!(
            target: "lanes.storage",
            "Storage opened at {}",
            layout.data_dir().display()
        );
        Ok(Self::new(layout))
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Root-confined file access inside one board directory.
    pub fn board_files(&self, board_id: &str) -> Result<FileTree, StorageError> {
        check_segment("board id", board_id)?;
        let dir = self.layout.board_dir(board_id);
        if !dir.is_dir() {
            return Err(StorageError::BoardNotFound(board_id.to_string()));
        }
        Ok(FileTree::new(dir))
    }

    /// Root-confined file access to the uploads tree.
    pub fn uploads(&self) -> FileTree {
        FileTree::new(self.layout.uploads_root())
    }

    pub(crate) fn require_board(&self, board_id: &str) -> Result<(), StorageError> {
        check_segment("board id", board_id)?;
        if self.layout.board_dir(board_id).is_dir() {
            Ok(())
        } else {
            Err(StorageError::BoardNotFound(board_id.to_string()))
        }
    }

    pub(crate) fn require_card(&self, board_id: &str, card_id: &str) -> Result<(), StorageError> {
        self.require_board(board_id)?;
        check_segment("card id", card_id)?;
        if self.layout.card_file(board_id, card_id).is_file() {
            Ok(())
        } else {
            Err(StorageError::CardNotFound {
                board_id: board_id.to_string(),
                card_id: card_id.to_string(),
            })
        }
    }

    /// Read and parse a JSON file. `Ok(None)` if it does not exist.
    pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(content.trim())
            .map(Some)
            .map_err(|e| StorageError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    /// Pretty-print `value` (2-space indent) and replace the file atomically.
    pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| StorageError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::atomic_write(path, json.as_bytes())?;
        Ok(())
    }

    /// Atomic write with fsync: write to a uniquely named hidden temp file
    /// next to the target, fsync, rename over the target, fsync directory.
    /// Concurrent writers each get their own temp file; the last rename wins.
    pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), io::Error> {
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".lanes-tmp")
            .tempfile_in(dir)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;
        // On failure the PersistError still owns the temp file and removes it on drop.
        tmp.persist(path).map_err(|e| e.error)?;

        // fsync directory for rename durability
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
        Ok(())
    }

    /// Remove a file, treating "already gone" as success. Returns whether
    /// anything was removed.
    pub(crate) fn remove_file_if_exists(path: &Path) -> Result<bool, io::Error> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove a directory tree, treating "already gone" as success.
    pub(crate) fn remove_dir_if_exists(path: &Path) -> Result<bool, io::Error> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_roots() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path().join("data")).unwrap();
        assert!(storage.layout().boards_root().is_dir());
        assert!(storage.layout().uploads_root().is_dir());
    }

    #[test]
    fn test_atomic_write_replaces_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("card.json");
        LocalStorage::atomic_write(&path, b"one").unwrap();
        LocalStorage::atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".lanes-tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_atomic_write_concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("card.json");
        let long = serde_json::to_string(&vec!["x".repeat(64); 64]).unwrap();
        let short = "[\"short\"]".to_string();

        for _ in 0..50 {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let path = path.clone();
                    let body = if i % 2 == 0 { long.clone() } else { short.clone() };
                    std::thread::spawn(move || LocalStorage::atomic_write(&path, body.as_bytes()))
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }

            let content = fs::read_to_string(&path).unwrap();
            assert!(content == long || content == short, "torn write: {}", content.len());
        }

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".lanes-tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_read_json_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.json");
        assert!(LocalStorage::read_json::<serde_json::Value>(&path)
            .unwrap()
            .is_none());

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LocalStorage::read_json::<serde_json::Value>(&path),
            Err(StorageError::Parse { .. })
        ));
    }

    #[test]
    fn test_remove_helpers_tolerate_missing() {
        let dir = TempDir::new().unwrap();
        assert!(!LocalStorage::remove_file_if_exists(&dir.path().join("nope")).unwrap());
        assert!(!LocalStorage::remove_dir_if_exists(&dir.path().join("nope")).unwrap());
    }

    #[test]
    fn test_board_files_requires_board() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        assert!(matches!(
            storage.board_files("missing"),
            Err(StorageError::BoardNotFound(_))
        ));
        assert!(matches!(
            storage.board_files(".."),
            Err(StorageError::PathTraversal(_))
        ));
    }
}
