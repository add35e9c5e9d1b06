use axum::{
    extract::State,
    response::{sse::Event, Json, Sse},
};
use serde::Serialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::log_bridge::{self, LogEntry};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    status: &'static str,
    port: u16,
    bind_address: String,
    data_dir: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    entries: Vec<LogEntry>,
    file_path: Option<String>,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let actual_port = state.live_port.lock().map(|p| *p).unwrap_or(state.port);
    Json(StatusResponse {
        status: "running",
        port: actual_port,
        bind_address: state.bind_address.clone(),
        data_dir: state.storage.layout().data_dir().display().to_string(),
    })
}

pub async fn list_logs() -> Json<LogsResponse> {
    Json(LogsResponse {
        entries: log_bridge::recent_entries(),
        file_path: log_bridge::log_file_path(),
    })
}

/// SSE endpoint: streams log entries as JSON to connected clients.
pub async fn stream_logs() -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = log_bridge::subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|item| {
        let entry = match item {
            Ok(entry) => entry,
            Err(_) => return None,
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(_) => return None,
        };
        Some(Ok(Event::default().data(payload)))
    });

    // Keep-alive every 30 seconds
    let stream = stream.merge(tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(
            std::time::Duration::from_secs(30),
        )),
        |_| Ok(Event::default().comment("keep-alive")),
    ));

    Sse::new(stream)
}
