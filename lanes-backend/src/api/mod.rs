use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use lanes_core::storage::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;

mod boards;
mod cards;
mod descriptions;
mod events;
mod file_ops;
mod media;
mod uploads;

use crate::state::AppState;

/// Axum REST API routes, nested under `/api`.
///
///   GET    /status                                   -> health check
///   GET    /logs, /logs/stream                       -> recent log entries / SSE
///   GET    /boards                                   -> list boards (+ skipped)
///   POST   /boards                                   -> create board
///   POST   /sample-board                             -> get or seed "Sample Board"
///   GET    /boards/{boardId}                         -> board with ordered cards
///   PATCH  /boards/{boardId}                         -> rename / change repo
///   DELETE /boards/{boardId}                         -> delete board
///   GET    /boards/{boardId}/cards                   -> list cards (+ skipped)
///   POST   /boards/{boardId}/cards                   -> create card
///   PUT    /boards/{boardId}/cards/order             -> set card order
///   GET    /boards/{boardId}/cards/{cardId}          -> read card
///   PATCH  /boards/{boardId}/cards/{cardId}          -> update card
///   DELETE /boards/{boardId}/cards/{cardId}          -> delete card
///   GET    /boards/{boardId}/cards/{cardId}/descriptions          -> list
///   POST   /boards/{boardId}/cards/{cardId}/descriptions          -> add
///   PUT    /boards/{boardId}/cards/{cardId}/descriptions/order    -> reorder
///   PATCH  /boards/{boardId}/cards/{cardId}/descriptions/{id}     -> update
///   DELETE /boards/{boardId}/cards/{cardId}/descriptions/{id}     -> delete by id
///   DELETE /boards/{boardId}/cards/{cardId}/descriptions/at/{i}   -> delete by index
///   POST   /boards/{boardId}/cards/{cardId}/upload-images         -> image + thumbnail
///   GET    /boards/{boardId}/cards/{cardId}/images                -> list images
///   GET    /boards/{boardId}/{*path}                 -> file bytes or directory listing
///   PUT    /boards/{boardId}/{*path}                 -> write file
///   POST   /boards/{boardId}/{*path}/mkdir           -> create directory
///   DELETE /boards/{boardId}/{*path}                 -> delete file or directory
///   POST   /uploads/{*path}                          -> raw upload
///   DELETE /uploads/{*path}                          -> delete upload
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(events::status))
        .route("/logs", get(events::list_logs))
        .route("/logs/stream", get(events::stream_logs))
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route("/sample-board", post(boards::sample_board))
        .route(
            "/boards/{board_id}",
            get(boards::get_board)
                .patch(boards::update_board)
                .delete(boards::delete_board),
        )
        .route(
            "/boards/{board_id}/cards",
            get(cards::list_cards).post(cards::create_card),
        )
        .route("/boards/{board_id}/cards/order", put(cards::reorder_cards))
        .route(
            "/boards/{board_id}/cards/{card_id}",
            get(cards::get_card)
                .patch(cards::update_card)
                .delete(cards::delete_card),
        )
        .route(
            "/boards/{board_id}/cards/{card_id}/descriptions",
            get(descriptions::list_descriptions).post(descriptions::add_description),
        )
        .route(
            "/boards/{board_id}/cards/{card_id}/descriptions/order",
            put(descriptions::reorder_descriptions),
        )
        .route(
            "/boards/{board_id}/cards/{card_id}/descriptions/{description_id}",
            axum::routing::patch(descriptions::update_description)
                .delete(descriptions::delete_description),
        )
        .route(
            "/boards/{board_id}/cards/{card_id}/descriptions/at/{index}",
            delete(descriptions::delete_description_at),
        )
        .route(
            "/boards/{board_id}/cards/{card_id}/upload-images",
            post(media::upload_images),
        )
        .route(
            "/boards/{board_id}/cards/{card_id}/images",
            get(media::list_images),
        )
        .route(
            "/boards/{board_id}/{*path}",
            get(file_ops::read_path)
                .put(file_ops::write_file)
                .post(file_ops::make_dir)
                .delete(file_ops::delete_path),
        )
        .route(
            "/uploads/{*path}",
            post(uploads::upload_file).delete(uploads::delete_upload),
        )
}

/// Routes outside `/api`: uploaded files served by path.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/uploads/{*path}", get(uploads::serve_upload))
}

// ── Shared types and helpers used across sub-modules ────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Build an error response and log it under `target`.
fn api_error(status: StatusCode, target: &'static str, error: impl Into<String>) -> ApiError {
    let error = error.into();
    log_api_issue(status, target, &error);
    error_response(status, error)
}

fn status_for(err: &StorageError) -> StatusCode {
    match err {
        StorageError::BoardNotFound(_)
        | StorageError::CardNotFound { .. }
        | StorageError::DescriptionNotFound(_)
        | StorageError::DescriptionIndexOutOfRange { .. }
        | StorageError::FileNotFound(_) => StatusCode::NOT_FOUND,
        StorageError::Validation(_) => StatusCode::BAD_REQUEST,
        StorageError::PathTraversal(_) => StatusCode::FORBIDDEN,
        StorageError::BoardExists(_) => StatusCode::CONFLICT,
        StorageError::Parse { .. } | StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a storage failure to its HTTP status. Server-side failures keep
/// their details in the log and return a generic message.
fn storage_error_response(err: StorageError, target: &'static str) -> ApiError {
    let status = status_for(&err);
    log_api_issue(status, target, err.to_string());
    let message = if status.is_server_error() {
        "Internal server error".to_string()
    } else {
        err.to_string()
    };
    error_response(status, message)
}

/// `axum::Json` with every rejection reported as a 400 `ErrorResponse`.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };
                Err(api_error(status, "lanes.api.request", rejection.body_text()))
            }
        }
    }
}

/// `axum::extract::Path` with rejections reported as an `ErrorResponse`.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                let status = rejection.status();
                if status.is_server_error() {
                    log_api_issue(status, "lanes.api.request", rejection.body_text());
                    return Err(error_response(status, "Internal server error"));
                }
                Err(api_error(status, "lanes.api.request", rejection.body_text()))
            }
        }
    }
}

/// Check if a user-supplied path segment contains path traversal sequences.
/// Percent-decodes the input first, then checks the decoded string for:
/// "..", "/", "\" and NUL.
fn has_path_traversal(input: &str) -> bool {
    use percent_encoding::percent_decode_str;
    let decoded = percent_decode_str(input).decode_utf8_lossy();
    decoded.contains("..")
        || decoded.contains('/')
        || decoded.contains('\\')
        || decoded.contains('\0')
}

/// Reject ids from the URL that are not a single plain segment.
fn check_id(kind: &str, value: &str, target: &'static str) -> ApiResult<()> {
    if has_path_traversal(value) {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            target,
            format!("Invalid {}: {}", kind, value),
        ));
    }
    Ok(())
}

fn insert_header_safe(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match value.parse() {
        Ok(parsed) => {
            headers.insert(name, parsed);
        }
        Err(e) => {
            log::warn!(
                target: "lanes.api",
                "Failed to set header {}={} ({})",
                name,
                value,
                e
            );
        }
    }
}

fn log_api_issue(status: StatusCode, target: &'static str, message: impl AsRef<str>) {
    let message = message.as_ref();
    if status.is_server_error() {
        log::error!(target: target, "{}", message);
    } else {
        log::warn!(target: target, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_path_traversal() {
        assert!(has_path_traversal(".."));
        assert!(has_path_traversal("..%2Fetc"));
        assert!(has_path_traversal("a/b"));
        assert!(has_path_traversal("a%5Cb"));
        assert!(!has_path_traversal("my-board"));
        assert!(!has_path_traversal("1700000000000"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&StorageError::BoardNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&StorageError::BoardExists("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&StorageError::PathTraversal("x".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&StorageError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&StorageError::Io(std::io::Error::other("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let (status, Json(body)) = storage_error_response(
            StorageError::Parse {
                path: "/secret/path/card.json".into(),
                message: "bad".into(),
            },
            "lanes.api.test",
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
    }
}
