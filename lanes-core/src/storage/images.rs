use std::fs;
use std::io;

use super::layout::{check_segment, THUMBNAILS_DIR, UPLOADS_DIR};
use super::local::LocalStorage;
use super::StorageError;
use crate::media::{dedup_filename, sanitize_filename, url_segment};
use crate::types::CardImage;

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

fn image_url(board_id: &str, card_id: &str, name: &str) -> String {
    format!("/{}/{}/{}/{}", UPLOADS_DIR, board_id, card_id, url_segment(name))
}

fn thumbnail_url(board_id: &str, card_id: &str, name: &str) -> String {
    format!(
        "/{}/{}/{}/{}/{}",
        UPLOADS_DIR,
        board_id,
        card_id,
        THUMBNAILS_DIR,
        url_segment(name)
    )
}

impl LocalStorage {
    /// Store an image and its client-made thumbnail under the card's upload
    /// directory. The image name is de-duplicated; the thumbnail is stored
    /// under the same final name so the pair stays linked.
    pub fn save_card_image(
        &self,
        board_id: &str,
        card_id: &str,
        image: &UploadedFile,
        thumbnail: Option<&UploadedFile>,
    ) -> Result<CardImage, StorageError> {
        self.require_card(board_id, card_id)?;
        let requested = sanitize_filename(&image.filename).ok_or_else(|| {
            StorageError::Validation(format!("Invalid image file name {:?}", image.filename))
        })?;

        let dir = self.layout().card_uploads_dir(board_id, card_id);
        fs::create_dir_all(&dir)?;
        let path = dedup_filename(&dir, &requested);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or(requested);
        Self::atomic_write(&path, &image.data)?;

        let thumbnail_url = match thumbnail {
            Some(thumb) => {
                let thumb_dir = dir.join(THUMBNAILS_DIR);
                fs::create_dir_all(&thumb_dir)?;
                Self::atomic_write(&thumb_dir.join(&name), &thumb.data)?;
                Some(thumbnail_url(board_id, card_id, &name))
            }
            None => None,
        };

        log::info!(
            target: "lanes.storage.images",
            "Saved image {}/{}/{} ({} bytes)",
            board_id,
            card_id,
            name,
            image.data.len()
        );
        Ok(CardImage {
            url: image_url(board_id, card_id, &name),
            thumbnail_url,
            name,
        })
    }

    /// Images uploaded for a card, sorted by name. A card without uploads
    /// has no images.
    pub fn list_card_images(&self, board_id: &str, card_id: &str) -> Result<Vec<CardImage>, StorageError> {
        check_segment("board id", board_id)?;
        check_segment("card id", card_id)?;
        let dir = self.layout().card_uploads_dir(board_id, card_id);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let thumbs = dir.join(THUMBNAILS_DIR);

        let mut images: Vec<CardImage> = entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .map(|name| CardImage {
                url: image_url(board_id, card_id, &name),
                thumbnail_url: thumbs
                    .join(&name)
                    .is_file()
                    .then(|| thumbnail_url(board_id, card_id, &name)),
                name,
            })
            .collect();
        images.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BoardRegistry, CardStore};
    use crate::types::NewCard;
    use tempfile::TempDir;

    fn file(name: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_save_and_list_images() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        storage.create_board("Shots", "").unwrap();
        let card = storage
            .create_card(
                "shots",
                &NewCard {
                    title: "Screens".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let first = storage
            .save_card_image("shots", &card.id, &file("ui.png", b"img"), Some(&file("t.png", b"th")))
            .unwrap();
        assert_eq!(first.name, "ui.png");
        assert_eq!(first.url, format!("/uploads/shots/{}/ui.png", card.id));
        assert_eq!(
            first.thumbnail_url,
            Some(format!("/uploads/shots/{}/thumbnails/ui.png", card.id))
        );

        let second = storage
            .save_card_image("shots", &card.id, &file("../ui.png", b"img2"), None)
            .unwrap();
        assert_eq!(second.name, "ui-1.png");
        assert_eq!(second.thumbnail_url, None);

        let images = storage.list_card_images("shots", &card.id).unwrap();
        let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ui-1.png", "ui.png"]);
        assert!(images[1].thumbnail_url.is_some());

        let stored = storage.layout().card_uploads_dir("shots", &card.id).join("ui.png");
        assert_eq!(fs::read(stored).unwrap(), b"img");
    }

    #[test]
    fn test_image_urls_are_escaped() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        storage.create_board("Shots", "").unwrap();
        let card = storage
            .create_card(
                "shots",
                &NewCard {
                    title: "Screens".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let image = storage
            .save_card_image(
                "shots",
                &card.id,
                &file("login page #2.png", b"img"),
                Some(&file("t.png", b"th")),
            )
            .unwrap();
        assert_eq!(image.name, "login page #2.png");
        assert_eq!(
            image.url,
            format!("/uploads/shots/{}/login%20page%20%232.png", card.id)
        );
        assert_eq!(
            image.thumbnail_url,
            Some(format!(
                "/uploads/shots/{}/thumbnails/login%20page%20%232.png",
                card.id
            ))
        );

        let listed = storage.list_card_images("shots", &card.id).unwrap();
        assert_eq!(listed[0].url, image.url);
    }

    #[test]
    fn test_save_image_requires_card() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        storage.create_board("Shots", "").unwrap();
        assert!(matches!(
            storage.save_card_image("shots", "1", &file("a.png", b"x"), None),
            Err(StorageError::CardNotFound { .. })
        ));
        assert!(storage.list_card_images("shots", "1").unwrap().is_empty());
    }
}
