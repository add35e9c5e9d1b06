/// On-disk layout under the data directory:
///
/// ```text
/// boards/{boardId}/board.json
/// boards/{boardId}/{cardId}/card.json
/// boards/{boardId}/{cardId}/descriptions/descriptions.json
/// boards/{boardId}/{cardId}/descriptions/description_{id}.md
/// uploads/{boardId}/{cardId}/{filename}
/// uploads/{boardId}/{cardId}/thumbnails/{filename}
/// ```
use std::path::{Path, PathBuf};

use super::StorageError;

pub const BOARDS_DIR: &str = "boards";
pub const UPLOADS_DIR: &str = "uploads";
pub const BOARD_FILE: &str = "board.json";
pub const CARD_FILE: &str = "card.json";
pub const DESCRIPTIONS_DIR: &str = "descriptions";
pub const DESCRIPTION_INDEX: &str = "descriptions.json";
pub const THUMBNAILS_DIR: &str = "thumbnails";

#[derive(Debug, Clone)]
pub struct StorageLayout {
    data_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn boards_root(&self) -> PathBuf {
        self.data_dir.join(BOARDS_DIR)
    }

    pub fn uploads_root(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_DIR)
    }

    pub fn board_dir(&self, board_id: &str) -> PathBuf {
        self.boards_root().join(board_id)
    }

    pub fn board_file(&self, board_id: &str) -> PathBuf {
        self.board_dir(board_id).join(BOARD_FILE)
    }

    pub fn card_dir(&self, board_id: &str, card_id: &str) -> PathBuf {
        self.board_dir(board_id).join(card_id)
    }

    pub fn card_file(&self, board_id: &str, card_id: &str) -> PathBuf {
        self.card_dir(board_id, card_id).join(CARD_FILE)
    }

    pub fn descriptions_dir(&self, board_id: &str, card_id: &str) -> PathBuf {
        self.card_dir(board_id, card_id).join(DESCRIPTIONS_DIR)
    }

    pub fn description_index(&self, board_id: &str, card_id: &str) -> PathBuf {
        self.descriptions_dir(board_id, card_id)
            .join(DESCRIPTION_INDEX)
    }

    pub fn board_uploads_dir(&self, board_id: &str) -> PathBuf {
        self.uploads_root().join(board_id)
    }

    pub fn card_uploads_dir(&self, board_id: &str, card_id: &str) -> PathBuf {
        self.board_uploads_dir(board_id).join(card_id)
    }

    /// Card file path relative to the boards root, as reported in `CardFolder::path`.
    pub fn card_relative_path(board_id: &str, card_id: &str) -> String {
        format!("{}/{}/{}", board_id, card_id, CARD_FILE)
    }

    pub fn description_filename(description_id: &str) -> String {
        format!("description_{}.md", description_id)
    }

    /// Inverse of `description_filename`, for files named by the current scheme.
    pub fn description_id_from_filename(filename: &str) -> Option<&str> {
        filename
            .strip_prefix("description_")
            .and_then(|rest| rest.strip_suffix(".md"))
            .filter(|id| !id.is_empty())
    }
}

/// Card directories are named by their numeric id.
pub fn is_card_dir_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Reject ids that are not a single plain path segment.
pub fn check_segment(kind: &str, value: &str) -> Result<(), StorageError> {
    if value.trim().is_empty() {
        return Err(StorageError::Validation(format!("{} is empty", kind)));
    }
    if value == "."
        || value == ".."
        || value.starts_with('.')
        || value.contains('/')
        || value.contains('\\')
        || value.contains('\0')
    {
        return Err(StorageError::PathTraversal(format!("{} {:?}", kind, value)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = StorageLayout::new("/data");
        assert_eq!(
            layout.card_file("b", "17"),
            PathBuf::from("/data/boards/b/17/card.json")
        );
        assert_eq!(
            layout.description_index("b", "17"),
            PathBuf::from("/data/boards/b/17/descriptions/descriptions.json")
        );
        assert_eq!(
            layout.card_uploads_dir("b", "17"),
            PathBuf::from("/data/uploads/b/17")
        );
        assert_eq!(StorageLayout::card_relative_path("b", "17"), "b/17/card.json");
    }

    #[test]
    fn test_description_filename_roundtrip() {
        let name = StorageLayout::description_filename("abc");
        assert_eq!(name, "description_abc.md");
        assert_eq!(StorageLayout::description_id_from_filename(&name), Some("abc"));
        assert_eq!(StorageLayout::description_id_from_filename("notes.md"), None);
    }

    #[test]
    fn test_card_dir_names() {
        assert!(is_card_dir_name("1700000000000"));
        assert!(!is_card_dir_name("board.json"));
        assert!(!is_card_dir_name("drafts"));
        assert!(!is_card_dir_name(""));
    }

    #[test]
    fn test_check_segment() {
        assert!(check_segment("board id", "my-board").is_ok());
        assert!(matches!(
            check_segment("board id", ".."),
            Err(StorageError::PathTraversal(_))
        ));
        assert!(matches!(
            check_segment("board id", "a/b"),
            Err(StorageError::PathTraversal(_))
        ));
        assert!(matches!(
            check_segment("board id", " "),
            Err(StorageError::Validation(_))
        ));
    }
}
