use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use lanes_core::storage::CardStore;
use lanes_core::types::{Board, CardFolder, CardUpdate, NewCard, SkippedEntry};
use serde::{Deserialize, Serialize};

use super::{check_id, storage_error_response, ApiPath, ApiResult, JsonBody};
use crate::state::AppState;

const TARGET: &str = "lanes.api.cards";

#[derive(Serialize)]
pub struct CardList {
    cards: Vec<CardFolder>,
    skipped: Vec<SkippedEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardOrderBody {
    card_ids: Vec<String>,
}

pub async fn list_cards(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<String>,
) -> ApiResult<Json<CardList>> {
    check_id("board id", &board_id, TARGET)?;
    let listing = state
        .storage
        .list_cards(&board_id)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(CardList {
        cards: listing.items,
        skipped: listing.skipped,
    }))
}

pub async fn create_card(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<String>,
    JsonBody(card): JsonBody<NewCard>,
) -> ApiResult<(StatusCode, Json<CardFolder>)> {
    check_id("board id", &board_id, TARGET)?;
    let folder = state
        .storage
        .create_card(&board_id, &card)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn get_card(
    State(state): State<AppState>,
    ApiPath((board_id, card_id)): ApiPath<(String, String)>,
) -> ApiResult<Json<CardFolder>> {
    check_id("board id", &board_id, TARGET)?;
    check_id("card id", &card_id, TARGET)?;
    let folder = state
        .storage
        .get_card(&board_id, &card_id)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(folder))
}

pub async fn update_card(
    State(state): State<AppState>,
    ApiPath((board_id, card_id)): ApiPath<(String, String)>,
    JsonBody(update): JsonBody<CardUpdate>,
) -> ApiResult<Json<CardFolder>> {
    check_id("board id", &board_id, TARGET)?;
    check_id("card id", &card_id, TARGET)?;
    let folder = state
        .storage
        .update_card(&board_id, &card_id, &update)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(folder))
}

pub async fn delete_card(
    State(state): State<AppState>,
    ApiPath((board_id, card_id)): ApiPath<(String, String)>,
) -> ApiResult<StatusCode> {
    check_id("board id", &board_id, TARGET)?;
    check_id("card id", &card_id, TARGET)?;
    state
        .storage
        .delete_card(&board_id, &card_id)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_cards(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<String>,
    JsonBody(body): JsonBody<CardOrderBody>,
) -> ApiResult<Json<Board>> {
    check_id("board id", &board_id, TARGET)?;
    let board = state
        .storage
        .reorder_cards(&board_id, &body.card_ids)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(board))
}
