use std::collections::HashMap;
use std::fs;
use std::io;

use super::layout::{check_segment, BOARD_FILE};
use super::local::LocalStorage;
use super::{BoardRegistry, CardStore, StorageError};
use crate::slug::board_id_from_name;
use crate::types::{Board, BoardConfig, BoardUpdate, CardFolder, Listing, SkippedEntry};

impl LocalStorage {
    /// The directory name is the board's identity; any `id` stored in
    /// `board.json` is replaced by it.
    pub(crate) fn load_board_config(&self, board_id: &str) -> Result<BoardConfig, StorageError> {
        check_segment("board id", board_id)?;
        let mut config: BoardConfig = Self::read_json(&self.layout().board_file(board_id))?
            .ok_or_else(|| StorageError::BoardNotFound(board_id.to_string()))?;
        config.id = board_id.to_string();
        Ok(config)
    }

    pub(crate) fn save_board_config(
        &self,
        board_id: &str,
        config: &BoardConfig,
    ) -> Result<(), StorageError> {
        check_segment("board id", board_id)?;
        let mut config = config.clone();
        config.id = board_id.to_string();
        Self::write_json(&self.layout().board_file(board_id), &config)
    }

    /// Load a board's cards and arrange them in the stored display order.
    /// Cards on disk that the order does not mention follow, by id.
    fn assemble_board(
        &self,
        board_id: &str,
        config: BoardConfig,
    ) -> Result<(Board, Vec<SkippedEntry>), StorageError> {
        let listing = self.list_cards(board_id)?;

        let position: HashMap<&str, usize> = config
            .cards
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut cards: Vec<CardFolder> = listing.items;
        // Stable sort keeps the id order of list_cards for unlisted cards.
        cards.sort_by_key(|folder| position.get(folder.id.as_str()).copied().unwrap_or(usize::MAX));

        let board = Board {
            id: board_id.to_string(),
            name: config.name,
            repo_url: config.repo_url,
            cards,
        };
        Ok((board, listing.skipped))
    }

    pub(crate) fn add_card_to_order(&self, board_id: &str, card_id: &str) -> Result<(), StorageError> {
        let mut config = self.load_board_config(board_id)?;
        if !config.cards.iter().any(|id| id == card_id) {
            config.cards.push(card_id.to_string());
            self.save_board_config(board_id, &config)?;
        }
        Ok(())
    }

    pub(crate) fn remove_card_from_order(&self, board_id: &str, card_id: &str) -> Result<(), StorageError> {
        let mut config = match self.load_board_config(board_id) {
            Ok(c) => c,
            Err(StorageError::BoardNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        let before = config.cards.len();
        config.cards.retain(|id| id != card_id);
        if config.cards.len() != before {
            self.save_board_config(board_id, &config)?;
        }
        Ok(())
    }
}

impl BoardRegistry for LocalStorage {
    fn list_boards(&self) -> Result<Listing<Board>, StorageError> {
        let mut listing = Listing::new();
        let entries = match fs::read_dir(self.layout().boards_root()) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(listing),
            Err(e) => return Err(e.into()),
        };

        let mut board_ids: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        board_ids.sort();

        for board_id in board_ids {
            let board_path = format!("{}/{}", board_id, BOARD_FILE);
            let loaded = self
                .load_board_config(&board_id)
                .and_then(|config| self.assemble_board(&board_id, config));
            match loaded {
                Ok((board, skipped)) => {
                    listing.items.push(board);
                    listing.skipped.extend(skipped);
                }
                Err(StorageError::BoardNotFound(_)) => {
                    listing.skip(board_path, "missing board.json");
                }
                Err(e) => {
                    log::warn!(
                        target: "lanes.storage.boards",
                        "Skipping board {}: {}",
                        board_id,
                        e
                    );
                    listing.skip(board_path, e.to_string());
                }
            }
        }
        Ok(listing)
    }

    fn get_board(&self, board_id: &str) -> Result<Board, StorageError> {
        let config = self.load_board_config(board_id)?;
        let (board, skipped) = self.assemble_board(board_id, config)?;
        for entry in &skipped {
            log::warn!(
                target: "lanes.storage.boards",
                "Board {}: skipped {} ({})",
                board_id,
                entry.path,
                entry.reason
            );
        }
        Ok(board)
    }

    fn create_board(&self, name: &str, repo_url: &str) -> Result<Board, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::Validation("Board name is required".to_string()));
        }
        let id = board_id_from_name(name);
        if id.is_empty() {
            return Err(StorageError::Validation(format!(
                "Board name {:?} has no usable characters for an id",
                name
            )));
        }

        let dir = self.layout().board_dir(&id);
        if dir.exists() {
            return Err(StorageError::BoardExists(id));
        }
        fs::create_dir_all(&dir)?;

        let config = BoardConfig {
            id: id.clone(),
            name: name.to_string(),
            repo_url: repo_url.trim().to_string(),
            cards: Vec::new(),
        };
        self.save_board_config(&id, &config)?;
        log::info!(target: "lanes.storage.boards", "Created board {} ({})", id, name);

        Ok(Board {
            id,
            name: config.name,
            repo_url: config.repo_url,
            cards: Vec::new(),
        })
    }

    fn update_board(&self, board_id: &str, update: &BoardUpdate) -> Result<Board, StorageError> {
        let mut config = self.load_board_config(board_id)?;
        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(StorageError::Validation("Board name is required".to_string()));
            }
            config.name = name.to_string();
        }
        if let Some(repo_url) = &update.repo_url {
            config.repo_url = repo_url.trim().to_string();
        }
        self.save_board_config(board_id, &config)?;
        self.get_board(board_id)
    }

    fn delete_board(&self, board_id: &str) -> Result<(), StorageError> {
        check_segment("board id", board_id)?;
        let removed = Self::remove_dir_if_exists(&self.layout().board_dir(board_id))?;
        Self::remove_dir_if_exists(&self.layout().board_uploads_dir(board_id))?;
        if removed {
            log::info!(target: "lanes.storage.boards", "Deleted board {}", board_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageLayout;
    use crate::types::{CardStatus, Codebase, NewCard};
    use tempfile::TempDir;

    fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        (dir, storage)
    }

    fn new_card(title: &str) -> NewCard {
        NewCard {
            title: title.to_string(),
            status: CardStatus::Todo,
            assignee: "alice".to_string(),
            codebase: Codebase::default(),
        }
    }

    #[test]
    fn test_create_then_get_board() {
        let (_dir, storage) = storage();
        let created = storage
            .create_board("My Board", "https://github.com/x/y")
            .unwrap();
        assert_eq!(created.id, "my-board");

        let board = storage.get_board("my-board").unwrap();
        assert_eq!(board.name, "My Board");
        assert_eq!(board.repo_url, "https://github.com/x/y");
        assert!(board.cards.is_empty());
    }

    #[test]
    fn test_create_board_collision_rejected() {
        let (_dir, storage) = storage();
        storage.create_board("My Board", "https://a").unwrap();
        let err = storage.create_board("my   board", "https://b").unwrap_err();
        assert!(matches!(err, StorageError::BoardExists(ref id) if id == "my-board"));

        let board = storage.get_board("my-board").unwrap();
        assert_eq!(board.repo_url, "https://a");
    }

    #[test]
    fn test_create_board_validation() {
        let (_dir, storage) = storage();
        assert!(matches!(
            storage.create_board("  ", ""),
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            storage.create_board("!!!", ""),
            Err(StorageError::Validation(_))
        ));
    }

    #[test]
    fn test_get_missing_board() {
        let (_dir, storage) = storage();
        assert!(matches!(
            storage.get_board("nope"),
            Err(StorageError::BoardNotFound(_))
        ));
    }

    #[test]
    fn test_list_boards_skips_broken() {
        let (_dir, storage) = storage();
        storage.create_board("Alpha", "").unwrap();
        storage.create_board("Beta", "").unwrap();

        let layout = StorageLayout::new(storage.layout().data_dir());
        fs::write(layout.board_file("beta"), "{ broken").unwrap();
        fs::create_dir_all(layout.board_dir("no-config")).unwrap();
        fs::create_dir_all(layout.board_dir(".trash")).unwrap();

        let listing = storage.list_boards().unwrap();
        let ids: Vec<_> = listing.items.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha"]);
        assert_eq!(listing.skipped.len(), 2);
        assert!(listing.skipped.iter().any(|s| s.path == "beta/board.json"));
        assert!(listing.skipped.iter().any(|s| s.path == "no-config/board.json"));
    }

    #[test]
    fn test_board_orders_cards_and_tracks_membership() {
        let (_dir, storage) = storage();
        storage.create_board("Work", "").unwrap();
        let a = storage.create_card("work", &new_card("A")).unwrap();
        let b = storage.create_card("work", &new_card("B")).unwrap();

        let config = storage.load_board_config("work").unwrap();
        assert_eq!(config.cards, vec![a.id.clone(), b.id.clone()]);

        let board = storage
            .reorder_cards("work", &[b.id.clone(), a.id.clone()])
            .unwrap();
        let titles: Vec<_> = board.cards.iter().map(|c| c.card.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);

        storage.delete_card("work", &b.id).unwrap();
        let config = storage.load_board_config("work").unwrap();
        assert_eq!(config.cards, vec![a.id]);
    }

    #[test]
    fn test_copied_board_dir_is_its_own_board() {
        let (_dir, storage) = storage();
        storage.create_board("Alpha", "").unwrap();
        let alpha_card = storage.create_card("alpha", &new_card("A")).unwrap();

        let layout = storage.layout();
        fs::create_dir_all(layout.board_dir("beta")).unwrap();
        fs::copy(layout.board_file("alpha"), layout.board_file("beta")).unwrap();

        let listing = storage.list_boards().unwrap();
        let ids: Vec<_> = listing.items.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);

        let beta = storage.get_board("beta").unwrap();
        assert_eq!(beta.id, "beta");
        assert!(beta.cards.is_empty());

        let beta_card = storage.create_card("beta", &new_card("B")).unwrap();
        let alpha = storage.load_board_config("alpha").unwrap();
        assert_eq!(alpha.cards, vec![alpha_card.id]);
        let beta = storage.get_board("beta").unwrap();
        assert_eq!(beta.cards.len(), 1);
        assert_eq!(beta.cards[0].id, beta_card.id);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(layout.board_file("beta")).unwrap()).unwrap();
        assert_eq!(raw["id"], "beta");
    }

    #[test]
    fn test_board_json_without_id() {
        let (_dir, storage) = storage();
        let layout = storage.layout();
        fs::create_dir_all(layout.board_dir("hand-made")).unwrap();
        fs::write(
            layout.board_file("hand-made"),
            r#"{ "name": "Hand Made", "cards": [] }"#,
        )
        .unwrap();

        let board = storage.get_board("hand-made").unwrap();
        assert_eq!(board.id, "hand-made");
        assert_eq!(board.name, "Hand Made");
        assert!(storage.list_boards().unwrap().skipped.is_empty());
    }

    #[test]
    fn test_update_board_keeps_id() {
        let (_dir, storage) = storage();
        storage.create_board("Old Name", "").unwrap();
        let board = storage
            .update_board(
                "old-name",
                &BoardUpdate {
                    name: Some("New Name".to_string()),
                    repo_url: Some("https://github.com/x/y".to_string()),
                },
            )
            .unwrap();
        assert_eq!(board.id, "old-name");
        assert_eq!(board.name, "New Name");
        assert_eq!(board.repo_url, "https://github.com/x/y");
    }

    #[test]
    fn test_delete_board_idempotent() {
        let (_dir, storage) = storage();
        storage.create_board("Gone", "").unwrap();
        storage.delete_board("gone").unwrap();
        storage.delete_board("gone").unwrap();
        assert!(matches!(
            storage.get_board("gone"),
            Err(StorageError::BoardNotFound(_))
        ));
    }
}
