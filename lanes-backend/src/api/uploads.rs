use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Json, Response},
};

use super::file_ops::{serve_tree_path, PathResponse};
use super::{api_error, storage_error_response, ApiPath, ApiResult};
use crate::state::AppState;

const TARGET: &str = "lanes.api.uploads";

/// POST /api/uploads/{*path} -- store the raw request body at `path`.
pub async fn upload_file(
    State(state): State<AppState>,
    ApiPath(path): ApiPath<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<PathResponse>)> {
    if body.len() > state.limits.max_bytes {
        return Err(api_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            TARGET,
            format!(
                "Upload of {} bytes exceeds the {} byte limit",
                body.len(),
                state.limits.max_bytes
            ),
        ));
    }
    state
        .storage
        .uploads()
        .write(&path, &body)
        .map_err(|e| storage_error_response(e, TARGET))?;
    log::info!(target: TARGET, "Stored upload {} ({} bytes)", path, body.len());
    Ok((
        StatusCode::CREATED,
        Json(PathResponse {
            message: "File uploaded successfully",
            path: format!("/uploads/{}", path),
        }),
    ))
}

/// DELETE /api/uploads/{*path} -- remove an uploaded file or directory.
pub async fn delete_upload(
    State(state): State<AppState>,
    ApiPath(path): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state
        .storage
        .uploads()
        .delete(&path)
        .map_err(|e| storage_error_response(e, TARGET))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /uploads/{*path} -- serve an uploaded file or list an upload directory.
pub async fn serve_upload(
    State(state): State<AppState>,
    ApiPath(path): ApiPath<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    serve_tree_path(&state.storage.uploads(), &path, &headers, TARGET)
}
