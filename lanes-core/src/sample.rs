/// Demo content: a "Sample Board" with a handful of cards and descriptions.
use crate::storage::{BoardRegistry, CardStore, DescriptionStore, StorageError};
use crate::types::{Board, CardStatus, Codebase, DescriptionInput, NewCard, DESCRIPTION_TITLE_PRESETS};

pub const SAMPLE_BOARD_NAME: &str = "Sample Board";
pub const SAMPLE_REPO_URL: &str = "https://github.com/microsoft/vscode";
const SAMPLE_CARD_COUNT: usize = 10;

const ASSIGNEES: &[&str] = &["vscode:clide", "vscode:roo", "cursor"];
const REPOS: &[&str] = &[
    "https://github.com/microsoft/vscode",
    "https://github.com/getcursor/cursor",
    "https://github.com/openai/openai-python",
];
const COMMITS: &[&str] = &[
    "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0",
    "b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1",
    "c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2",
];
const DESCRIPTIONS: &[&str] = &[
    "Implement user authentication",
    "Add dark mode support",
    "Fix performance issues",
    "Update documentation",
    "Refactor component structure",
    "Add unit tests",
    "Implement error handling",
    "Optimize database queries",
    "Add new feature X",
    "Fix bug in Y component",
];

/// The cards the sample board is seeded with. The first one is always
/// "Sample Card"; the rest rotate through statuses, assignees and repos.
pub fn sample_cards() -> Vec<NewCard> {
    let mut cards = vec![NewCard {
        title: "Sample Card".to_string(),
        status: CardStatus::Todo,
        assignee: ASSIGNEES[0].to_string(),
        codebase: Codebase {
            repo: REPOS[0].to_string(),
            commit: COMMITS[0].to_string(),
        },
    }];
    for i in 1..SAMPLE_CARD_COUNT {
        cards.push(NewCard {
            title: format!("Task {}", i),
            status: CardStatus::ALL[i % CardStatus::ALL.len()],
            assignee: ASSIGNEES[i % ASSIGNEES.len()].to_string(),
            codebase: Codebase {
                repo: REPOS[(i / 2) % REPOS.len()].to_string(),
                commit: COMMITS[(i / 3) % COMMITS.len()].to_string(),
            },
        });
    }
    cards
}

/// One to three descriptions for the `i`-th sample card.
fn sample_descriptions(i: usize) -> Vec<DescriptionInput> {
    let count = i % 3 + 1;
    (0..count)
        .map(|n| {
            let text = DESCRIPTIONS[(i + n * 3) % DESCRIPTIONS.len()];
            DescriptionInput {
                content: format!("{}\n", text),
                title: Some(DESCRIPTION_TITLE_PRESETS[n % DESCRIPTION_TITLE_PRESETS.len()].to_string()),
                tags: vec!["sample".to_string()],
            }
        })
        .collect()
}

/// Return the board named "Sample Board", creating and seeding it first if
/// no such board exists.
pub fn ensure_sample_board<S>(storage: &S) -> Result<Board, StorageError>
where
    S: BoardRegistry + CardStore + DescriptionStore,
{
    let existing = storage
        .list_boards()?
        .items
        .into_iter()
        .find(|board| board.name == SAMPLE_BOARD_NAME);
    if let Some(board) = existing {
        return Ok(board);
    }

    let board = storage.create_board(SAMPLE_BOARD_NAME, SAMPLE_REPO_URL)?;
    for (i, card) in sample_cards().iter().enumerate() {
        let folder = storage.create_card(&board.id, card)?;
        for description in sample_descriptions(i) {
            storage.add_description(&board.id, &folder.id, &description)?;
        }
    }
    log::info!(
        target: "lanes.sample",
        "Seeded {} with {} cards",
        board.id,
        SAMPLE_CARD_COUNT
    );
    storage.get_board(&board.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    #[test]
    fn test_sample_cards_deterministic() {
        let cards = sample_cards();
        assert_eq!(cards.len(), SAMPLE_CARD_COUNT);
        assert_eq!(cards[0].title, "Sample Card");
        assert_eq!(cards[1].title, "Task 1");
        assert_eq!(sample_cards()[5].assignee, cards[5].assignee);
    }

    #[test]
    fn test_ensure_sample_board_seeds_once() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();

        let board = ensure_sample_board(&storage).unwrap();
        assert_eq!(board.id, "sample-board");
        assert_eq!(board.repo_url, SAMPLE_REPO_URL);
        assert_eq!(board.cards.len(), SAMPLE_CARD_COUNT);
        assert_eq!(board.cards[0].card.title, "Sample Card");

        for folder in &board.cards {
            let descriptions = storage.list_descriptions(&board.id, &folder.id).unwrap();
            assert!((1..=3).contains(&descriptions.items.len()));
        }

        let again = ensure_sample_board(&storage).unwrap();
        assert_eq!(again.cards.len(), SAMPLE_CARD_COUNT);
        assert_eq!(storage.list_boards().unwrap().items.len(), 1);
    }
}
