use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Titles a description may carry. Anything else is rejected on write.
pub const DESCRIPTION_TITLE_PRESETS: &[&str] = &[
    "Overview",
    "Requirements",
    "Implementation",
    "Testing",
    "Notes",
];

pub fn is_title_preset(title: &str) -> bool {
    DESCRIPTION_TITLE_PRESETS.contains(&title)
}

/// Current time truncated to milliseconds, the precision stored on disk.
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A timestamp strictly later than `previous`, even if the clock has not moved.
pub fn timestamp_after(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_timestamp();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Todo,
    Doing,
    Done,
}

impl CardStatus {
    pub const ALL: [CardStatus; 3] = [CardStatus::Todo, CardStatus::Doing, CardStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Todo => "todo",
            CardStatus::Doing => "doing",
            CardStatus::Done => "done",
        }
    }
}

impl Default for CardStatus {
    fn default() -> Self {
        CardStatus::Todo
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Code reference a card is linked to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codebase {
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub commit: String,
}

/// Contents of `card.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    pub status: CardStatus,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub codebase: Codebase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Keys written by older versions or other tools, carried through updates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A card together with its location on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardFolder {
    pub id: String,
    pub card: Card,
    /// `{boardId}/{cardId}/card.json`, relative to the boards root.
    pub path: String,
}

/// Fields accepted when creating a card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub title: String,
    #[serde(default)]
    pub status: CardStatus,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub codebase: Codebase,
}

/// Partial card update. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CardStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebase: Option<Codebase>,
}

/// Contents of `board.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardConfig {
    /// Mirrors the board directory name, which is authoritative.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub repo_url: String,
    /// Card ids in display order.
    #[serde(default, deserialize_with = "deserialize_card_refs")]
    pub cards: Vec<String>,
}

/// Older board files stored whole card folders in `cards`; only the id matters.
#[derive(Deserialize)]
#[serde(untagged)]
enum CardRef {
    Id(String),
    Folder { id: String },
}

fn deserialize_card_refs<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let refs = Vec::<CardRef>::deserialize(deserializer)?;
    Ok(refs
        .into_iter()
        .map(|r| match r {
            CardRef::Id(id) | CardRef::Folder { id } => id,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub repo_url: String,
    pub cards: Vec<CardFolder>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
}

/// A markdown note attached to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptionInput {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial description update. `title: null` clears the title, an absent
/// `title` keeps it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// An entry that a listing could not load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: String,
}

/// Result of a tolerant listing: everything that loaded, plus what did not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub skipped: Vec<SkippedEntry>,
}

impl<T> Listing<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn skip(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedEntry {
            path: path.into(),
            reason: reason.into(),
        });
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// An image attached to a card, addressed by its public upload URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardImage {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_keeps_unknown_fields() {
        let json = r#"{
            "id": "1700000000000",
            "title": "Task",
            "status": "doing",
            "assignee": "alice",
            "codebase": { "repo": "https://github.com/x/y", "commit": "abc123" },
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z",
            "descriptions": ["legacy"]
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.status, CardStatus::Doing);
        assert!(card.extra.contains_key("descriptions"));

        let back = serde_json::to_value(&card).unwrap();
        assert_eq!(back["descriptions"][0], "legacy");
        assert_eq!(back["createdAt"], back["updatedAt"]);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let json = r#"{"title": "x", "status": "blocked"}"#;
        assert!(serde_json::from_str::<NewCard>(json).is_err());
    }

    #[test]
    fn test_board_config_accepts_legacy_card_folders() {
        let json = r#"{
            "id": "my-board",
            "name": "My Board",
            "repoUrl": "",
            "cards": [
                "1",
                { "id": "2", "card": { "title": "old" }, "path": "my-board/2/card.json" }
            ]
        }"#;
        let config: BoardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cards, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_description_update_distinguishes_null_title() {
        let cleared: DescriptionUpdate = serde_json::from_str(r#"{"title": null}"#).unwrap();
        assert_eq!(cleared.title, Some(None));

        let absent: DescriptionUpdate = serde_json::from_str(r#"{"content": "x"}"#).unwrap();
        assert_eq!(absent.title, None);
    }

    #[test]
    fn test_timestamp_after_is_strictly_later() {
        let future = now_timestamp() + Duration::seconds(60);
        assert!(timestamp_after(future) > future);
    }

    #[test]
    fn test_title_presets() {
        assert!(is_title_preset("Overview"));
        assert!(!is_title_preset("overview"));
    }
}
