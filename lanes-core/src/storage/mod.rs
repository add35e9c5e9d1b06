mod boards;
mod cards;
mod descriptions;
pub mod files;
mod images;
pub mod layout;
pub mod local;

pub use files::{content_etag, FileTree};
pub use images::UploadedFile;
pub use layout::StorageLayout;
pub use local::LocalStorage;

use crate::types::{
    Board, BoardUpdate, CardFolder, CardUpdate, Description, DescriptionInput, DescriptionUpdate,
    Listing, NewCard,
};

/// Board directories and their `board.json`.
pub trait BoardRegistry: Send + Sync {
    /// All boards with their cards. Boards or cards that fail to load are
    /// reported in `skipped` instead of failing the whole listing.
    fn list_boards(&self) -> Result<Listing<Board>, StorageError>;

    fn get_board(&self, board_id: &str) -> Result<Board, StorageError>;

    /// Create a board whose id is derived from `name`. Fails with
    /// `BoardExists` if that id is taken.
    fn create_board(&self, name: &str, repo_url: &str) -> Result<Board, StorageError>;

    fn update_board(&self, board_id: &str, update: &BoardUpdate) -> Result<Board, StorageError>;

    /// Remove the board tree and its uploads. Missing boards are not an error.
    fn delete_board(&self, board_id: &str) -> Result<(), StorageError>;
}

/// Cards stored as `{boardId}/{cardId}/card.json`.
pub trait CardStore: Send + Sync {
    fn create_card(&self, board_id: &str, card: &NewCard) -> Result<CardFolder, StorageError>;

    fn get_card(&self, board_id: &str, card_id: &str) -> Result<CardFolder, StorageError>;

    /// Cards of a board, ordered by id. Unreadable cards land in `skipped`.
    fn list_cards(&self, board_id: &str) -> Result<Listing<CardFolder>, StorageError>;

    fn update_card(
        &self,
        board_id: &str,
        card_id: &str,
        update: &CardUpdate,
    ) -> Result<CardFolder, StorageError>;

    /// Remove the card and everything under it. Missing cards are not an error.
    fn delete_card(&self, board_id: &str, card_id: &str) -> Result<(), StorageError>;

    /// Set the board's card display order.
    fn reorder_cards(&self, board_id: &str, card_ids: &[String]) -> Result<Board, StorageError>;
}

/// Markdown descriptions under `{cardId}/descriptions/`, ordered by `descriptions.json`.
pub trait DescriptionStore: Send + Sync {
    fn list_descriptions(
        &self,
        board_id: &str,
        card_id: &str,
    ) -> Result<Listing<Description>, StorageError>;

    fn add_description(
        &self,
        board_id: &str,
        card_id: &str,
        input: &DescriptionInput,
    ) -> Result<Description, StorageError>;

    fn update_description(
        &self,
        board_id: &str,
        card_id: &str,
        description_id: &str,
        update: &DescriptionUpdate,
    ) -> Result<Description, StorageError>;

    /// Delete by stable id. Missing descriptions are not an error.
    fn delete_description(
        &self,
        board_id: &str,
        card_id: &str,
        description_id: &str,
    ) -> Result<(), StorageError>;

    /// Delete by position in the display order.
    fn delete_description_at(
        &self,
        board_id: &str,
        card_id: &str,
        index: usize,
    ) -> Result<(), StorageError>;

    fn reorder_descriptions(
        &self,
        board_id: &str,
        card_id: &str,
        description_ids: &[String],
    ) -> Result<Listing<Description>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    BoardNotFound(String),

    #[error("Card not found: {board_id}/{card_id}")]
    CardNotFound { board_id: String, card_id: String },

    #[error("Description not found: {0}")]
    DescriptionNotFound(String),

    #[error("Description index {index} out of range ({len} descriptions)")]
    DescriptionIndexOutOfRange { index: usize, len: usize },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Board already exists: {0}")]
    BoardExists(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Path escapes storage root: {0}")]
    PathTraversal(String),

    #[error("Malformed file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::BoardNotFound(_)
                | StorageError::CardNotFound { .. }
                | StorageError::DescriptionNotFound(_)
                | StorageError::FileNotFound(_)
        )
    }
}
