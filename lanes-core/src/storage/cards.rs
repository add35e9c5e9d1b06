use std::collections::HashSet;
use std::fs;
use std::io;

use serde_json::Map;

use super::layout::{check_segment, is_card_dir_name, StorageLayout};
use super::local::LocalStorage;
use super::{BoardRegistry, CardStore, StorageError};
use crate::types::{now_timestamp, timestamp_after, Board, Card, CardFolder, CardUpdate, Listing, NewCard};

impl LocalStorage {
    fn read_card(&self, board_id: &str, card_id: &str) -> Result<Card, StorageError> {
        check_segment("card id", card_id)?;
        Self::read_json(&self.layout().card_file(board_id, card_id))?.ok_or_else(|| {
            StorageError::CardNotFound {
                board_id: board_id.to_string(),
                card_id: card_id.to_string(),
            }
        })
    }

    fn write_card(&self, board_id: &str, card: &Card) -> Result<(), StorageError> {
        Self::write_json(&self.layout().card_file(board_id, &card.id), card)
    }

    /// Millisecond-timestamp id, bumped until no directory by that name exists.
    fn next_card_id(&self, board_id: &str) -> String {
        let mut candidate = now_timestamp().timestamp_millis();
        while self
            .layout()
            .card_dir(board_id, &candidate.to_string())
            .exists()
        {
            candidate += 1;
        }
        candidate.to_string()
    }

    fn folder(board_id: &str, card: Card) -> CardFolder {
        CardFolder {
            id: card.id.clone(),
            path: StorageLayout::card_relative_path(board_id, &card.id),
            card,
        }
    }
}

fn validate_title(title: &str) -> Result<String, StorageError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StorageError::Validation("Card title is required".to_string()));
    }
    Ok(title.to_string())
}

impl CardStore for LocalStorage {
    fn create_card(&self, board_id: &str, new_card: &NewCard) -> Result<CardFolder, StorageError> {
        // Nothing is written unless board.json loads.
        self.load_board_config(board_id)?;
        let title = validate_title(&new_card.title)?;

        let id = self.next_card_id(board_id);
        let now = now_timestamp();
        let card = Card {
            id: id.clone(),
            title,
            status: new_card.status,
            assignee: new_card.assignee.trim().to_string(),
            codebase: new_card.codebase.clone(),
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        };

        let descriptions_dir = self.layout().descriptions_dir(board_id, &id);
        fs::create_dir_all(&descriptions_dir)?;
        self.write_card(board_id, &card)?;
        Self::write_json(
            &self.layout().description_index(board_id, &id),
            &Vec::<String>::new(),
        )?;
        self.add_card_to_order(board_id, &id)?;

        log::info!(
            target: "lanes.storage.cards",
            "Created card {}/{} ({})",
            board_id,
            id,
            card.title
        );
        Ok(Self::folder(board_id, card))
    }

    fn get_card(&self, board_id: &str, card_id: &str) -> Result<CardFolder, StorageError> {
        self.require_board(board_id)?;
        let card = self.read_card(board_id, card_id)?;
        Ok(Self::folder(board_id, card))
    }

    fn list_cards(&self, board_id: &str) -> Result<Listing<CardFolder>, StorageError> {
        self.require_board(board_id)?;
        let mut listing = Listing::new();
        let entries = match fs::read_dir(self.layout().board_dir(board_id)) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::BoardNotFound(board_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut card_ids: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| is_card_dir_name(name))
            .collect();
        card_ids.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        for card_id in card_ids {
            let path = StorageLayout::card_relative_path(board_id, &card_id);
            match self.read_card(board_id, &card_id) {
                Ok(card) => listing.items.push(CardFolder {
                    id: card_id,
                    card,
                    path,
                }),
                Err(e) => {
                    let reason = match &e {
                        StorageError::CardNotFound { .. } => "missing card.json".to_string(),
                        other => other.to_string(),
                    };
                    log::warn!(
                        target: "lanes.storage.cards",
                        "Skipping card {}: {}",
                        path,
                        reason
                    );
                    listing.skip(path, reason);
                }
            }
        }
        Ok(listing)
    }

    fn update_card(
        &self,
        board_id: &str,
        card_id: &str,
        update: &CardUpdate,
    ) -> Result<CardFolder, StorageError> {
        self.require_board(board_id)?;
        let mut card = self.read_card(board_id, card_id)?;

        if let Some(title) = &update.title {
            card.title = validate_title(title)?;
        }
        if let Some(status) = update.status {
            card.status = status;
        }
        if let Some(assignee) = &update.assignee {
            card.assignee = assignee.trim().to_string();
        }
        if let Some(codebase) = &update.codebase {
            card.codebase = codebase.clone();
        }
        // Guard against a card.json whose id drifted from its directory name.
        card.id = card_id.to_string();
        card.updated_at = timestamp_after(card.updated_at);

        self.write_card(board_id, &card)?;
        log::debug!(
            target: "lanes.storage.cards",
            "Updated card {}/{}",
            board_id,
            card_id
        );
        Ok(Self::folder(board_id, card))
    }

    fn delete_card(&self, board_id: &str, card_id: &str) -> Result<(), StorageError> {
        check_segment("board id", board_id)?;
        check_segment("card id", card_id)?;
        let layout = self.layout();

        Self::remove_file_if_exists(&layout.card_file(board_id, card_id))?;
        Self::remove_dir_if_exists(&layout.descriptions_dir(board_id, card_id))?;
        let removed = Self::remove_dir_if_exists(&layout.card_dir(board_id, card_id))?;
        Self::remove_dir_if_exists(&layout.card_uploads_dir(board_id, card_id))?;
        self.remove_card_from_order(board_id, card_id)?;

        if removed {
            log::info!(
                target: "lanes.storage.cards",
                "Deleted card {}/{}",
                board_id,
                card_id
            );
        }
        Ok(())
    }

    fn reorder_cards(&self, board_id: &str, card_ids: &[String]) -> Result<Board, StorageError> {
        let mut config = self.load_board_config(board_id)?;
        let on_disk: Vec<String> = self
            .list_cards(board_id)?
            .items
            .into_iter()
            .map(|folder| folder.id)
            .collect();
        let known: HashSet<&str> = on_disk.iter().map(String::as_str).collect();

        let mut order: Vec<String> = Vec::with_capacity(on_disk.len());
        let mut seen: HashSet<String> = HashSet::new();
        for id in card_ids {
            if known.contains(id.as_str()) && seen.insert(id.clone()) {
                order.push(id.clone());
            }
        }
        // Cards the request left out keep their previous relative order.
        let previous = config.cards.iter().chain(on_disk.iter());
        for id in previous {
            if known.contains(id.as_str()) && seen.insert(id.clone()) {
                order.push(id.clone());
            }
        }

        config.cards = order;
        self.save_board_config(board_id, &config)?;
        self.get_board(board_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardStatus, Codebase};
    use tempfile::TempDir;

    fn storage_with_board() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        storage.create_board("My Board", "https://github.com/x/y").unwrap();
        (dir, storage)
    }

    fn task(title: &str) -> NewCard {
        NewCard {
            title: title.to_string(),
            status: CardStatus::Todo,
            assignee: "alice".to_string(),
            codebase: Codebase {
                repo: "https://github.com/x/y".to_string(),
                commit: "abc123".to_string(),
            },
        }
    }

    #[test]
    fn test_create_card_layout() {
        let (_dir, storage) = storage_with_board();
        let folder = storage.create_card("my-board", &task("Task 1")).unwrap();

        assert!(!folder.id.is_empty());
        assert!(folder.id.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(folder.card.created_at, folder.card.updated_at);
        assert_eq!(folder.card.status, CardStatus::Todo);
        assert_eq!(folder.path, format!("my-board/{}/card.json", folder.id));

        let layout = storage.layout();
        assert!(layout.card_file("my-board", &folder.id).is_file());
        let index = fs::read_to_string(layout.description_index("my-board", &folder.id)).unwrap();
        assert_eq!(serde_json::from_str::<Vec<String>>(&index).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_create_card_ids_unique() {
        let (_dir, storage) = storage_with_board();
        let ids: HashSet<String> = (0..5)
            .map(|i| storage.create_card("my-board", &task(&format!("T{}", i))).unwrap().id)
            .collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_create_card_requires_board_and_title() {
        let (_dir, storage) = storage_with_board();
        assert!(matches!(
            storage.create_card("missing", &task("x")),
            Err(StorageError::BoardNotFound(_))
        ));
        assert!(matches!(
            storage.create_card("my-board", &task("   ")),
            Err(StorageError::Validation(_))
        ));
    }

    #[test]
    fn test_create_card_without_board_json_leaves_nothing() {
        let (_dir, storage) = storage_with_board();
        let layout = storage.layout();
        fs::create_dir_all(layout.board_dir("bare")).unwrap();

        assert!(matches!(
            storage.create_card("bare", &task("Orphan")),
            Err(StorageError::BoardNotFound(_))
        ));
        assert_eq!(fs::read_dir(layout.board_dir("bare")).unwrap().count(), 0);
        assert!(storage.list_cards("bare").unwrap().items.is_empty());
    }

    #[test]
    fn test_update_card_status() {
        let (_dir, storage) = storage_with_board();
        let created = storage.create_card("my-board", &task("Task 1")).unwrap();

        storage
            .update_card(
                "my-board",
                &created.id,
                &CardUpdate {
                    status: Some(CardStatus::Doing),
                    ..Default::default()
                },
            )
            .unwrap();

        let listing = storage.list_cards("my-board").unwrap();
        assert_eq!(listing.items.len(), 1);
        let card = &listing.items[0].card;
        assert_eq!(card.status, CardStatus::Doing);
        assert_eq!(card.title, "Task 1");
        assert_eq!(card.created_at, created.card.created_at);
        assert!(card.updated_at > card.created_at);
    }

    #[test]
    fn test_update_preserves_unknown_fields() {
        let (_dir, storage) = storage_with_board();
        let created = storage.create_card("my-board", &task("Task")).unwrap();
        let path = storage.layout().card_file("my-board", &created.id);

        let mut raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw["priority"] = serde_json::json!("high");
        fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

        storage
            .update_card(
                "my-board",
                &created.id,
                &CardUpdate {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["priority"], "high");
        assert_eq!(raw["title"], "Renamed");
    }

    #[test]
    fn test_list_cards_excludes_non_card_entries() {
        let (_dir, storage) = storage_with_board();
        let created = storage.create_card("my-board", &task("Real")).unwrap();
        let board_dir = storage.layout().board_dir("my-board");
        fs::create_dir_all(board_dir.join("drafts")).unwrap();
        fs::create_dir_all(board_dir.join("12345")).unwrap();
        fs::create_dir_all(board_dir.join("99999")).unwrap();
        fs::write(board_dir.join("99999").join("card.json"), "not json").unwrap();

        let listing = storage.list_cards("my-board").unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].id, created.id);
        let skipped: Vec<_> = listing.skipped.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(skipped, vec!["my-board/12345/card.json", "my-board/99999/card.json"]);
    }

    #[test]
    fn test_delete_card_twice() {
        let (_dir, storage) = storage_with_board();
        let created = storage.create_card("my-board", &task("Temp")).unwrap();
        let uploads = storage.layout().card_uploads_dir("my-board", &created.id);
        fs::create_dir_all(&uploads).unwrap();

        storage.delete_card("my-board", &created.id).unwrap();
        storage.delete_card("my-board", &created.id).unwrap();

        assert!(!storage.layout().card_dir("my-board", &created.id).exists());
        assert!(!uploads.exists());
        assert!(matches!(
            storage.get_card("my-board", &created.id),
            Err(StorageError::CardNotFound { .. })
        ));
        assert!(storage.list_cards("my-board").unwrap().items.is_empty());
    }

    #[test]
    fn test_reorder_cards_drops_unknown_and_appends_rest() {
        let (_dir, storage) = storage_with_board();
        let a = storage.create_card("my-board", &task("A")).unwrap();
        let b = storage.create_card("my-board", &task("B")).unwrap();
        let c = storage.create_card("my-board", &task("C")).unwrap();

        let board = storage
            .reorder_cards("my-board", &[c.id.clone(), "404".to_string(), a.id.clone()])
            .unwrap();
        let ids: Vec<_> = board.cards.iter().map(|f| f.id.clone()).collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);
    }
}
