use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::layout::{check_segment, StorageLayout};
use super::local::LocalStorage;
use super::{DescriptionStore, StorageError};
use crate::frontmatter;
use crate::types::{
    is_title_preset, now_timestamp, timestamp_after, Description, DescriptionInput,
    DescriptionUpdate, Listing, DESCRIPTION_TITLE_PRESETS,
};

/// Frontmatter of a `description_{id}.md` file. Everything is optional on
/// read so hand-edited files still load.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptionHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<&Description> for DescriptionHeader {
    fn from(d: &Description) -> Self {
        Self {
            id: Some(d.id.clone()),
            title: d.title.clone(),
            tags: d.tags.clone(),
            created_at: Some(d.created_at),
            updated_at: Some(d.updated_at),
        }
    }
}

/// A loaded description and the index entry it came from.
struct Entry {
    filename: String,
    description: Description,
}

fn normalize_title(title: Option<&str>) -> Result<Option<String>, StorageError> {
    match title.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) if is_title_preset(t) => Ok(Some(t.to_string())),
        Some(t) => Err(StorageError::Validation(format!(
            "Unknown description title {:?}, expected one of: {}",
            t,
            DESCRIPTION_TITLE_PRESETS.join(", ")
        ))),
    }
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

fn modified_time(path: &Path) -> DateTime<Utc> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Utc>::from(t).trunc_subsecs(3))
        .unwrap_or_else(|_| now_timestamp())
}

fn parse_description(filename: &str, path: &Path, source: &str) -> Result<Description, StorageError> {
    let doc = frontmatter::split(source);
    let header: DescriptionHeader = match doc.header {
        Some(yaml) if !yaml.trim().is_empty() => {
            serde_yaml::from_str(yaml).map_err(|e| StorageError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        }
        _ => DescriptionHeader::default(),
    };

    let id = header
        .id
        .or_else(|| StorageLayout::description_id_from_filename(filename).map(str::to_string))
        .unwrap_or_else(|| filename.trim_end_matches(".md").to_string());
    let created_at = header.created_at.unwrap_or_else(|| modified_time(path));
    let updated_at = header.updated_at.unwrap_or(created_at);

    Ok(Description {
        id,
        title: header.title,
        tags: header.tags,
        created_at,
        updated_at,
        content: doc.body.to_string(),
    })
}

impl LocalStorage {
    fn read_description_index(&self, board_id: &str, card_id: &str) -> Result<Vec<String>, StorageError> {
        Ok(Self::read_json(&self.layout().description_index(board_id, card_id))?.unwrap_or_default())
    }

    fn write_description_index(
        &self,
        board_id: &str,
        card_id: &str,
        index: &[String],
    ) -> Result<(), StorageError> {
        let dir = self.layout().descriptions_dir(board_id, card_id);
        fs::create_dir_all(&dir)?;
        Self::write_json(&self.layout().description_index(board_id, card_id), &index)
    }

    fn write_description(
        &self,
        board_id: &str,
        card_id: &str,
        filename: &str,
        description: &Description,
    ) -> Result<(), StorageError> {
        let path = self.layout().descriptions_dir(board_id, card_id).join(filename);
        let header = DescriptionHeader::from(description);
        let text = frontmatter::render(&header, &description.content).map_err(|e| {
            StorageError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        Self::atomic_write(&path, text.as_bytes())?;
        Ok(())
    }

    /// Load every indexed description in order. Entries that cannot be
    /// loaded are reported in the second return value.
    fn load_descriptions(
        &self,
        board_id: &str,
        card_id: &str,
    ) -> Result<(Vec<Entry>, Listing<Description>), StorageError> {
        self.require_card(board_id, card_id)?;
        let dir = self.layout().descriptions_dir(board_id, card_id);
        let card_path = format!("{}/{}", board_id, card_id);
        let mut entries = Vec::new();
        let mut failures = Listing::new();

        for filename in self.read_description_index(board_id, card_id)? {
            let display_path = format!("{}/descriptions/{}", card_path, filename);
            if check_segment("description file", &filename).is_err() {
                log::warn!(
                    target: "lanes.storage.descriptions",
                    "Ignoring index entry {:?} in {}",
                    filename,
                    card_path
                );
                failures.skip(display_path, "invalid file name");
                continue;
            }
            let path = dir.join(&filename);
            let loaded = match fs::read_to_string(&path) {
                Ok(source) => parse_description(&filename, &path, &source),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(StorageError::FileNotFound(display_path.clone()))
                }
                Err(e) => Err(e.into()),
            };
            match loaded {
                Ok(description) => entries.push(Entry {
                    filename,
                    description,
                }),
                Err(e) => {
                    let reason = match &e {
                        StorageError::FileNotFound(_) => "missing file".to_string(),
                        other => other.to_string(),
                    };
                    log::warn!(
                        target: "lanes.storage.descriptions",
                        "Skipping description {}: {}",
                        display_path,
                        reason
                    );
                    failures.skip(display_path, reason);
                }
            }
        }
        Ok((entries, failures))
    }

    fn find_description(
        &self,
        board_id: &str,
        card_id: &str,
        description_id: &str,
    ) -> Result<Option<Entry>, StorageError> {
        let (entries, _) = self.load_descriptions(board_id, card_id)?;
        Ok(entries
            .into_iter()
            .find(|entry| entry.description.id == description_id))
    }

    fn remove_description_file(
        &self,
        board_id: &str,
        card_id: &str,
        filename: &str,
    ) -> Result<(), StorageError> {
        let mut index = self.read_description_index(board_id, card_id)?;
        index.retain(|f| f != filename);
        self.write_description_index(board_id, card_id, &index)?;
        let path = self.layout().descriptions_dir(board_id, card_id).join(filename);
        Self::remove_file_if_exists(&path)?;
        log::info!(
            target: "lanes.storage.descriptions",
            "Deleted description {}/{}/{}",
            board_id,
            card_id,
            filename
        );
        Ok(())
    }
}

impl DescriptionStore for LocalStorage {
    fn list_descriptions(
        &self,
        board_id: &str,
        card_id: &str,
    ) -> Result<Listing<Description>, StorageError> {
        let (entries, failures) = self.load_descriptions(board_id, card_id)?;
        Ok(Listing {
            items: entries.into_iter().map(|e| e.description).collect(),
            skipped: failures.skipped,
        })
    }

    fn add_description(
        &self,
        board_id: &str,
        card_id: &str,
        input: &DescriptionInput,
    ) -> Result<Description, StorageError> {
        self.require_card(board_id, card_id)?;
        let title = normalize_title(input.title.as_deref())?;

        let id = Uuid::new_v4().simple().to_string();
        let filename = StorageLayout::description_filename(&id);
        let now = now_timestamp();
        let description = Description {
            id,
            title,
            tags: normalize_tags(&input.tags),
            created_at: now,
            updated_at: now,
            content: input.content.clone(),
        };

        fs::create_dir_all(self.layout().descriptions_dir(board_id, card_id))?;
        self.write_description(board_id, card_id, &filename, &description)?;
        let mut index = self.read_description_index(board_id, card_id)?;
        index.push(filename);
        self.write_description_index(board_id, card_id, &index)?;

        log::info!(
            target: "lanes.storage.descriptions",
            "Added description {} to {}/{}",
            description.id,
            board_id,
            card_id
        );
        Ok(description)
    }

    fn update_description(
        &self,
        board_id: &str,
        card_id: &str,
        description_id: &str,
        update: &DescriptionUpdate,
    ) -> Result<Description, StorageError> {
        let Entry {
            filename,
            mut description,
        } = self
            .find_description(board_id, card_id, description_id)?
            .ok_or_else(|| StorageError::DescriptionNotFound(description_id.to_string()))?;

        if let Some(title) = &update.title {
            description.title = normalize_title(title.as_deref())?;
        }
        if let Some(tags) = &update.tags {
            description.tags = normalize_tags(tags);
        }
        if let Some(content) = &update.content {
            description.content = content.clone();
        }
        description.updated_at = timestamp_after(description.updated_at);

        self.write_description(board_id, card_id, &filename, &description)?;
        log::debug!(
            target: "lanes.storage.descriptions",
            "Updated description {}/{}/{}",
            board_id,
            card_id,
            description_id
        );
        Ok(description)
    }

    fn delete_description(
        &self,
        board_id: &str,
        card_id: &str,
        description_id: &str,
    ) -> Result<(), StorageError> {
        match self.find_description(board_id, card_id, description_id)? {
            Some(entry) => self.remove_description_file(board_id, card_id, &entry.filename),
            None => Ok(()),
        }
    }

    fn delete_description_at(
        &self,
        board_id: &str,
        card_id: &str,
        index: usize,
    ) -> Result<(), StorageError> {
        let (entries, _) = self.load_descriptions(board_id, card_id)?;
        let entry = entries
            .get(index)
            .ok_or(StorageError::DescriptionIndexOutOfRange {
                index,
                len: entries.len(),
            })?;
        self.remove_description_file(board_id, card_id, &entry.filename)
    }

    fn reorder_descriptions(
        &self,
        board_id: &str,
        card_id: &str,
        description_ids: &[String],
    ) -> Result<Listing<Description>, StorageError> {
        let (entries, _) = self.load_descriptions(board_id, card_id)?;
        let previous = self.read_description_index(board_id, card_id)?;

        let mut order: Vec<String> = Vec::with_capacity(previous.len());
        let mut seen: HashSet<String> = HashSet::new();
        for id in description_ids {
            if let Some(entry) = entries.iter().find(|e| &e.description.id == id) {
                if seen.insert(entry.filename.clone()) {
                    order.push(entry.filename.clone());
                }
            }
        }
        // Unmentioned entries, including ones that failed to load, keep their order.
        for filename in previous {
            if seen.insert(filename.clone()) {
                order.push(filename);
            }
        }

        self.write_description_index(board_id, card_id, &order)?;
        self.list_descriptions(board_id, card_id)
    }
}
