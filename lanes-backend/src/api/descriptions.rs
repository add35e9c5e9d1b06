use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use lanes_core::storage::DescriptionStore;
use lanes_core::types::{Description, DescriptionInput, DescriptionUpdate, SkippedEntry};
use serde::{Deserialize, Serialize};

use super::{check_id, storage_error_response, ApiPath, ApiResult, JsonBody};
use crate::state::AppState;

const TARGET: &str = "lanes.api.descriptions";

#[derive(Serialize)]
pub struct DescriptionList {
    descriptions: Vec<Description>,
    skipped: Vec<SkippedEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionOrderBody {
    description_ids: Vec<String>,
}

fn check_card(board_id: &str, card_id: &str) -> ApiResult<()> {
    check_id("board id", board_id, TARGET)?;
    check_id("card id", card_id, TARGET)
}

pub async fn list_descriptions(
    State(state): State<AppState>,
    ApiPath((board_id, card_id)): ApiPath<(String, String)>,
) -> ApiResult<Json<DescriptionList>> {
    check_card(&board_id, &card_id)?;
    let listing = state
        .storage
        .list_descriptions(&board_id, &card_id)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(DescriptionList {
        descriptions: listing.items,
        skipped: listing.skipped,
    }))
}

pub async fn add_description(
    State(state): State<AppState>,
    ApiPath((board_id, card_id)): ApiPath<(String, String)>,
    JsonBody(input): JsonBody<DescriptionInput>,
) -> ApiResult<(StatusCode, Json<Description>)> {
    check_card(&board_id, &card_id)?;
    let description = state
        .storage
        .add_description(&board_id, &card_id, &input)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok((StatusCode::CREATED, Json(description)))
}

pub async fn update_description(
    State(state): State<AppState>,
    ApiPath((board_id, card_id, description_id)): ApiPath<(String, String, String)>,
    JsonBody(update): JsonBody<DescriptionUpdate>,
) -> ApiResult<Json<Description>> {
    check_card(&board_id, &card_id)?;
    let description = state
        .storage
        .update_description(&board_id, &card_id, &description_id, &update)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(description))
}

pub async fn delete_description(
    State(state): State<AppState>,
    ApiPath((board_id, card_id, description_id)): ApiPath<(String, String, String)>,
) -> ApiResult<StatusCode> {
    check_card(&board_id, &card_id)?;
    state
        .storage
        .delete_description(&board_id, &card_id, &description_id)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_description_at(
    State(state): State<AppState>,
    ApiPath((board_id, card_id, index)): ApiPath<(String, String, usize)>,
) -> ApiResult<StatusCode> {
    check_card(&board_id, &card_id)?;
    state
        .storage
        .delete_description_at(&board_id, &card_id, index)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_descriptions(
    State(state): State<AppState>,
    ApiPath((board_id, card_id)): ApiPath<(String, String)>,
    JsonBody(body): JsonBody<DescriptionOrderBody>,
) -> ApiResult<Json<DescriptionList>> {
    check_card(&board_id, &card_id)?;
    let listing = state
        .storage
        .reorder_descriptions(&board_id, &card_id, &body.description_ids)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(DescriptionList {
        descriptions: listing.items,
        skipped: listing.skipped,
    }))
}
