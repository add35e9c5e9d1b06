use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use lanes_core::media::content_type_for_path;
use lanes_core::storage::{content_etag, FileTree};
use lanes_core::types::{EntryKind, FileEntry};
use serde::Serialize;

use super::{api_error, check_id, insert_header_safe, storage_error_response, ApiPath, ApiResult};
use crate::state::AppState;

const TARGET: &str = "lanes.api.files";

#[derive(Serialize)]
pub struct DirectoryListing {
    pub files: Vec<FileEntry>,
}

#[derive(Serialize)]
pub struct PathResponse {
    pub message: &'static str,
    pub path: String,
}

fn board_tree(state: &AppState, board_id: &str) -> ApiResult<FileTree> {
    check_id("board id", board_id, TARGET)?;
    state
        .storage
        .board_files(board_id)
        .map_err(|e| storage_error_response(e, TARGET))
}

/// Serve a file (raw bytes, content type from the extension, ETag) or a
/// directory listing from `tree`. HEAD is answered by axum from the same
/// response with the body stripped.
pub(super) fn serve_tree_path(
    tree: &FileTree,
    path: &str,
    request_headers: &HeaderMap,
    target: &'static str,
) -> ApiResult<Response> {
    let kind = tree
        .stat(path)
        .map_err(|e| storage_error_response(e, target))?;
    if kind == EntryKind::Directory {
        let files = tree
            .list_dir(path)
            .map_err(|e| storage_error_response(e, target))?;
        return Ok(Json(DirectoryListing { files }).into_response());
    }

    let data = tree
        .read(path)
        .map_err(|e| storage_error_response(e, target))?;
    let etag = content_etag(&data);

    let mut headers = HeaderMap::new();
    insert_header_safe(&mut headers, "etag", &etag);
    insert_header_safe(&mut headers, "cache-control", "no-cache");

    // Check If-None-Match for conditional response
    if let Some(if_none_match) = request_headers.get("if-none-match") {
        if let Ok(value) = if_none_match.to_str() {
            if value.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*") {
                return Ok((StatusCode::NOT_MODIFIED, headers).into_response());
            }
        }
    }

    let content_type = content_type_for_path(std::path::Path::new(path));
    insert_header_safe(&mut headers, "content-type", content_type);
    insert_header_safe(&mut headers, "x-content-type-options", "nosniff");
    Ok((headers, data).into_response())
}

/// GET/HEAD /boards/{board_id}/{*path} -- file content or directory listing.
pub async fn read_path(
    State(state): State<AppState>,
    ApiPath((board_id, path)): ApiPath<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let tree = board_tree(&state, &board_id)?;
    serve_tree_path(&tree, &path, &headers, TARGET)
}

/// PUT /boards/{board_id}/{*path} -- write the raw request body to a file.
pub async fn write_file(
    State(state): State<AppState>,
    ApiPath((board_id, path)): ApiPath<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<PathResponse>> {
    let tree = board_tree(&state, &board_id)?;
    tree.write(&path, &body)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(Json(PathResponse {
        message: "File written",
        path: format!("{}/{}", board_id, path),
    }))
}

/// POST /boards/{board_id}/{*path}/mkdir -- create a directory (and parents).
pub async fn make_dir(
    State(state): State<AppState>,
    ApiPath((board_id, path)): ApiPath<(String, String)>,
) -> ApiResult<Json<PathResponse>> {
    let dir = match path.strip_suffix("/mkdir") {
        Some(dir) if !dir.trim_matches('/').is_empty() => dir.to_string(),
        Some(_) => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                TARGET,
                "Directory path is required",
            ))
        }
        None => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                TARGET,
                format!("No POST handler for {}/{}", board_id, path),
            ))
        }
    };
    let tree = board_tree(&state, &board_id)?;
    tree.mkdir(&dir)
        .map_err(|e| storage_error_response(e, TARGET))?;
    log::info!(target: TARGET, "Created directory {}/{}", board_id, dir);
    Ok(Json(PathResponse {
        message: "Directory created",
        path: format!("{}/{}", board_id, dir),
    }))
}

/// DELETE /boards/{board_id}/{*path} -- delete a file or directory tree.
pub async fn delete_path(
    State(state): State<AppState>,
    ApiPath((board_id, path)): ApiPath<(String, String)>,
) -> ApiResult<StatusCode> {
    let tree = board_tree(&state, &board_id)?;
    tree.delete(&path)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(StatusCode::NO_CONTENT)
}
