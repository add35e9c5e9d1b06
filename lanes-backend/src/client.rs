/// Typed async client for the Lanes HTTP API.
///
/// Every method maps to one endpoint. Non-2xx responses become
/// `ClientError::Api` carrying the status and the server's `error` message.
use lanes_core::types::{
    Board, BoardUpdate, CardFolder, CardImage, CardUpdate, Description, DescriptionInput,
    DescriptionUpdate, FileEntry, Listing, NewCard, SkippedEntry,
};
use lanes_core::media::url_segment;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub status: String,
    pub port: u16,
    pub bind_address: String,
    pub data_dir: String,
}

/// An image file to upload, with the MIME type to declare for it.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub mime: String,
    pub data: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct BoardList {
    boards: Vec<Board>,
    #[serde(default)]
    skipped: Vec<SkippedEntry>,
}

#[derive(Deserialize)]
struct CardList {
    cards: Vec<CardFolder>,
    #[serde(default)]
    skipped: Vec<SkippedEntry>,
}

#[derive(Deserialize)]
struct DescriptionList {
    descriptions: Vec<Description>,
    #[serde(default)]
    skipped: Vec<SkippedEntry>,
}

#[derive(Deserialize)]
struct ImageList {
    images: Vec<CardImage>,
}

#[derive(Deserialize)]
struct DirectoryListing {
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
struct PathBody {
    path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBoardBody<'a> {
    name: &'a str,
    repo_url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CardOrderBody<'a> {
    card_ids: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescriptionOrderBody<'a> {
    description_ids: &'a [String],
}

fn segment(value: &str) -> String {
    url_segment(value)
}

/// Encode a relative path segment by segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn a non-success response into `ClientError::Api`.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                text
            }
        });
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    Ok(check(response).await?.json::<T>().await?)
}

#[derive(Debug, Clone)]
pub struct LanesClient {
    http: reqwest::Client,
    base_url: String,
}

impl LanesClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3456`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn board_url(&self, board_id: &str) -> String {
        self.api(&format!("/boards/{}", segment(board_id)))
    }

    fn card_url(&self, board_id: &str, card_id: &str) -> String {
        format!("{}/cards/{}", self.board_url(board_id), segment(card_id))
    }

    fn descriptions_url(&self, board_id: &str, card_id: &str) -> String {
        format!("{}/descriptions", self.card_url(board_id, card_id))
    }

    fn file_url(&self, board_id: &str, path: &str) -> String {
        format!("{}/{}", self.board_url(board_id), encode_path(path))
    }

    // ── Server ──────────────────────────────────────────────────────────

    pub async fn status(&self) -> Result<ServerStatus, ClientError> {
        json(self.http.get(self.api("/status")).send().await?).await
    }

    // ── Boards ──────────────────────────────────────────────────────────

    pub async fn list_boards(&self) -> Result<Listing<Board>, ClientError> {
        let list: BoardList = json(self.http.get(self.api("/boards")).send().await?).await?;
        Ok(Listing {
            items: list.boards,
            skipped: list.skipped,
        })
    }

    pub async fn get_board(&self, board_id: &str) -> Result<Board, ClientError> {
        json(self.http.get(self.board_url(board_id)).send().await?).await
    }

    pub async fn create_board(&self, name: &str, repo_url: &str) -> Result<Board, ClientError> {
        let body = CreateBoardBody { name, repo_url };
        json(self.http.post(self.api("/boards")).json(&body).send().await?).await
    }

    pub async fn update_board(&self, board_id: &str, update: &BoardUpdate) -> Result<Board, ClientError> {
        json(self.http.patch(self.board_url(board_id)).json(update).send().await?).await
    }

    pub async fn delete_board(&self, board_id: &str) -> Result<(), ClientError> {
        check(self.http.delete(self.board_url(board_id)).send().await?).await?;
        Ok(())
    }

    pub async fn sample_board(&self) -> Result<Board, ClientError> {
        json(self.http.post(self.api("/sample-board")).send().await?).await
    }

    // ── Cards ───────────────────────────────────────────────────────────

    pub async fn list_cards(&self, board_id: &str) -> Result<Listing<CardFolder>, ClientError> {
        let url = format!("{}/cards", self.board_url(board_id));
        let list: CardList = json(self.http.get(url).send().await?).await?;
        Ok(Listing {
            items: list.cards,
            skipped: list.skipped,
        })
    }

    pub async fn get_card(&self, board_id: &str, card_id: &str) -> Result<CardFolder, ClientError> {
        json(self.http.get(self.card_url(board_id, card_id)).send().await?).await
    }

    pub async fn create_card(&self, board_id: &str, card: &NewCard) -> Result<CardFolder, ClientError> {
        let url = format!("{}/cards", self.board_url(board_id));
        json(self.http.post(url).json(card).send().await?).await
    }

    pub async fn update_card(
        &self,
        board_id: &str,
        card_id: &str,
        update: &CardUpdate,
    ) -> Result<CardFolder, ClientError> {
        json(
            self.http
                .patch(self.card_url(board_id, card_id))
                .json(update)
                .send()
                .await?,
        )
        .await
    }

    pub async fn delete_card(&self, board_id: &str, card_id: &str) -> Result<(), ClientError> {
        check(self.http.delete(self.card_url(board_id, card_id)).send().await?).await?;
        Ok(())
    }

    pub async fn reorder_cards(&self, board_id: &str, card_ids: &[String]) -> Result<Board, ClientError> {
        let url = format!("{}/cards/order", self.board_url(board_id));
        let body = CardOrderBody { card_ids };
        json(self.http.put(url).json(&body).send().await?).await
    }

    // ── Descriptions ────────────────────────────────────────────────────

    pub async fn list_descriptions(
        &self,
        board_id: &str,
        card_id: &str,
    ) -> Result<Listing<Description>, ClientError> {
        let list: DescriptionList =
            json(self.http.get(self.descriptions_url(board_id, card_id)).send().await?).await?;
        Ok(Listing {
            items: list.descriptions,
            skipped: list.skipped,
        })
    }

    pub async fn add_description(
        &self,
        board_id: &str,
        card_id: &str,
        input: &DescriptionInput,
    ) -> Result<Description, ClientError> {
        json(
            self.http
                .post(self.descriptions_url(board_id, card_id))
                .json(input)
                .send()
                .await?,
        )
        .await
    }

    pub async fn update_description(
        &self,
        board_id: &str,
        card_id: &str,
        description_id: &str,
        update: &DescriptionUpdate,
    ) -> Result<Description, ClientError> {
        let url = format!(
            "{}/{}",
            self.descriptions_url(board_id, card_id),
            segment(description_id)
        );
        json(self.http.patch(url).json(update).send().await?).await
    }

    pub async fn delete_description(
        &self,
        board_id: &str,
        card_id: &str,
        description_id: &str,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/{}",
            self.descriptions_url(board_id, card_id),
            segment(description_id)
        );
        check(self.http.delete(url).send().await?).await?;
        Ok(())
    }

    pub async fn delete_description_at(
        &self,
        board_id: &str,
        card_id: &str,
        index: usize,
    ) -> Result<(), ClientError> {
        let url = format!("{}/at/{}", self.descriptions_url(board_id, card_id), index);
        check(self.http.delete(url).send().await?).await?;
        Ok(())
    }

    pub async fn reorder_descriptions(
        &self,
        board_id: &str,
        card_id: &str,
        description_ids: &[String],
    ) -> Result<Listing<Description>, ClientError> {
        let url = format!("{}/order", self.descriptions_url(board_id, card_id));
        let body = DescriptionOrderBody { description_ids };
        let list: DescriptionList = json(self.http.put(url).json(&body).send().await?).await?;
        Ok(Listing {
            items: list.descriptions,
            skipped: list.skipped,
        })
    }

    // ── Images ──────────────────────────────────────────────────────────

    pub async fn upload_card_image(
        &self,
        board_id: &str,
        card_id: &str,
        image: ImageUpload,
        thumbnail: ImageUpload,
    ) -> Result<CardImage, ClientError> {
        let part = |upload: ImageUpload| {
            Part::bytes(upload.data)
                .file_name(upload.filename)
                .mime_str(&upload.mime)
        };
        let form = Form::new()
            .part("image", part(image)?)
            .part("thumbnail", part(thumbnail)?);
        let url = format!("{}/upload-images", self.card_url(board_id, card_id));
        json(self.http.post(url).multipart(form).send().await?).await
    }

    pub async fn list_card_images(&self, board_id: &str, card_id: &str) -> Result<Vec<CardImage>, ClientError> {
        let url = format!("{}/images", self.card_url(board_id, card_id));
        let list: ImageList = json(self.http.get(url).send().await?).await?;
        Ok(list.images)
    }

    // ── Generic board files ─────────────────────────────────────────────

    pub async fn read_file(&self, board_id: &str, path: &str) -> Result<Vec<u8>, ClientError> {
        let response = check(self.http.get(self.file_url(board_id, path)).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn read_file_text(&self, board_id: &str, path: &str) -> Result<String, ClientError> {
        let response = check(self.http.get(self.file_url(board_id, path)).send().await?).await?;
        Ok(response.text().await?)
    }

    pub async fn write_file(&self, board_id: &str, path: &str, data: impl Into<Vec<u8>>) -> Result<(), ClientError> {
        check(
            self.http
                .put(self.file_url(board_id, path))
                .body(data.into())
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    pub async fn delete_file(&self, board_id: &str, path: &str) -> Result<(), ClientError> {
        check(self.http.delete(self.file_url(board_id, path)).send().await?).await?;
        Ok(())
    }

    /// HEAD request: `Ok(false)` on 404, an error for any other failure.
    pub async fn file_exists(&self, board_id: &str, path: &str) -> Result<bool, ClientError> {
        let response = self.http.head(self.file_url(board_id, path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await?;
        Ok(true)
    }

    pub async fn list_dir(&self, board_id: &str, path: &str) -> Result<Vec<FileEntry>, ClientError> {
        let listing: DirectoryListing =
            json(self.http.get(self.file_url(board_id, path)).send().await?).await?;
        Ok(listing.files)
    }

    pub async fn mkdir(&self, board_id: &str, path: &str) -> Result<(), ClientError> {
        let url = format!("{}/mkdir", self.file_url(board_id, path));
        check(self.http.post(url).send().await?).await?;
        Ok(())
    }

    // ── Uploads ─────────────────────────────────────────────────────────

    /// Store raw bytes under the uploads root. Returns the public URL path.
    pub async fn upload(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<String, ClientError> {
        let url = self.api(&format!("/uploads/{}", encode_path(path)));
        let body: PathBody = json(
            self.http
                .post(url)
                .header("content-type", "application/octet-stream")
                .body(data.into())
                .send()
                .await?,
        )
        .await?;
        Ok(body.path)
    }

    pub async fn delete_upload(&self, path: &str) -> Result<(), ClientError> {
        let url = self.api(&format!("/uploads/{}", encode_path(path)));
        check(self.http.delete(url).send().await?).await?;
        Ok(())
    }

    /// Fetch an uploaded file by its public path (as returned by `upload`).
    pub async fn fetch_upload(&self, public_path: &str) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}/{}", self.base_url, public_path.trim_start_matches('/'));
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("notes/a b.md"), "notes/a%20b.md");
        assert_eq!(encode_path("/x/y/"), "x/y");
        assert_eq!(segment("../etc"), "..%2Fetc");
    }

    #[test]
    fn test_urls() {
        let client = LanesClient::new("http://127.0.0.1:3456/");
        assert_eq!(client.base_url(), "http://127.0.0.1:3456");
        assert_eq!(
            client.card_url("my-board", "17"),
            "http://127.0.0.1:3456/api/boards/my-board/cards/17"
        );
        assert_eq!(
            client.file_url("my-board", "17/card.json"),
            "http://127.0.0.1:3456/api/boards/my-board/17/card.json"
        );
    }
}
