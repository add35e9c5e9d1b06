use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use lanes_core::sample::ensure_sample_board;
use lanes_core::storage::BoardRegistry;
use lanes_core::types::{Board, BoardUpdate, SkippedEntry};
use serde::{Deserialize, Serialize};

use super::{check_id, storage_error_response, ApiPath, ApiResult, JsonBody};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardBody {
    name: String,
    #[serde(default)]
    repo_url: String,
}

#[derive(Serialize)]
pub struct BoardList {
    boards: Vec<Board>,
    skipped: Vec<SkippedEntry>,
}

pub async fn list_boards(State(state): State<AppState>) -> ApiResult<Json<BoardList>> {
    let listing = state
        .storage
        .list_boards()
        .map_err(|e| storage_error_response(e, "lanes.api.boards"))?;
    Ok(Json(BoardList {
        boards: listing.items,
        skipped: listing.skipped,
    }))
}

pub async fn create_board(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateBoardBody>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    let board = state
        .storage
        .create_board(&body.name, &body.repo_url)
        .map_err(|e| storage_error_response(e, "lanes.api.boards"))?;
    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn sample_board(State(state): State<AppState>) -> ApiResult<Json<Board>> {
    let board = ensure_sample_board(state.storage.as_ref())
        .map_err(|e| storage_error_response(e, "lanes.api.boards"))?;
    Ok(Json(board))
}

pub async fn get_board(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<String>,
) -> ApiResult<Json<Board>> {
    check_id("board id", &board_id, "lanes.api.boards")?;
    let board = state
        .storage
        .get_board(&board_id)
        .map_err(|e| storage_error_response(e, "lanes.api.boards"))?;
    Ok(Json(board))
}

pub async fn update_board(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<String>,
    JsonBody(update): JsonBody<BoardUpdate>,
) -> ApiResult<Json<Board>> {
    check_id("board id", &board_id, "lanes.api.boards")?;
    let board = state
        .storage
        .update_board(&board_id, &update)
        .map_err(|e| storage_error_response(e, "lanes.api.boards"))?;
    Ok(Json(board))
}

pub async fn delete_board(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    check_id("board id", &board_id, "lanes.api.boards")?;
    state
        .storage
        .delete_board(&board_id)
        .map_err(|e| storage_error_response(e, "lanes.api.boards"))?;
    Ok(StatusCode::NO_CONTENT)
}
