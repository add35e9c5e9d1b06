use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::Json,
};
use lanes_core::media::is_image_mime;
use lanes_core::storage::UploadedFile;
use lanes_core::types::CardImage;
use serde::Serialize;

use super::{api_error, check_id, storage_error_response, ApiPath, ApiResult};
use crate::state::AppState;

const TARGET: &str = "lanes.api.media";

#[derive(Serialize)]
pub struct ImageList {
    images: Vec<CardImage>,
}

async fn read_image_field(field: Field<'_>, max_bytes: usize) -> ApiResult<UploadedFile> {
    let name = field.name().unwrap_or("").to_string();
    let mime = field.content_type().unwrap_or("").to_string();
    if !is_image_mime(&mime) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            TARGET,
            format!("Only image files are allowed ({}: {:?})", name, mime),
        ));
    }
    let filename = field.file_name().unwrap_or(&name).to_string();

    let data = field.bytes().await.map_err(|e| {
        let status = match e.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        api_error(status, TARGET, format!("Failed to read file data: {}", e))
    })?;
    if data.len() > max_bytes {
        return Err(api_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            TARGET,
            format!("{} exceeds the {} byte limit", filename, max_bytes),
        ));
    }
    if data.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            TARGET,
            format!("Empty file: {}", filename),
        ));
    }
    Ok(UploadedFile {
        filename,
        data: data.to_vec(),
    })
}

/// POST /boards/{board_id}/cards/{card_id}/upload-images -- multipart form
/// with an `image` and its client-made `thumbnail`.
pub async fn upload_images(
    State(state): State<AppState>,
    ApiPath((board_id, card_id)): ApiPath<(String, String)>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<CardImage>)> {
    check_id("board id", &board_id, TARGET)?;
    check_id("card id", &card_id, TARGET)?;

    let mut image = None;
    let mut thumbnail = None;
    let mut file_count = 0;
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            let status = match e.status() {
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            };
            api_error(status, TARGET, format!("Failed to read multipart: {}", e))
        })?;
        let Some(field) = field else { break };

        file_count += 1;
        if file_count > state.limits.max_files {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                TARGET,
                format!("At most {} files per upload", state.limits.max_files),
            ));
        }
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("image") => image = Some(read_image_field(field, state.limits.max_bytes).await?),
            Some("thumbnail") => {
                thumbnail = Some(read_image_field(field, state.limits.max_bytes).await?)
            }
            other => {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    TARGET,
                    format!("Unexpected form field {:?}", other.unwrap_or("")),
                ))
            }
        }
    }

    let (Some(image), Some(thumbnail)) = (image, thumbnail) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            TARGET,
            "Both image and thumbnail are required",
        ));
    };
    let saved = state
        .storage
        .save_card_image(&board_id, &card_id, &image, Some(&thumbnail))
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /boards/{board_id}/cards/{card_id}/images -- images attached to a card.
pub async fn list_images(
    State(state): State<AppState>,
    ApiPath((board_id, card_id)): ApiPath<(String, String)>,
) -> ApiResult<Json<ImageList>> {
    check_id("board id", &board_id, TARGET)?;
    check_id("card id", &card_id, TARGET)?;
    let images = state
        .storage
        .list_card_images(&board_id, &card_id)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(ImageList { images }))
}
