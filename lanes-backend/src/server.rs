/// HTTP server: spawns axum on a background tokio task.
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{api_router, public_router};
use crate::state::AppState;

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    log::debug!(
        target: "lanes.api.request",
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Full application router: `/api/...` plus the public `/uploads/...` files.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .nest("/api", api_router())
        .merge(public_router())
        .layer(DefaultBodyLimit::max(state.limits.body_limit()))
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(state)
}

pub async fn spawn_server(state: AppState) -> Result<u16, Box<dyn std::error::Error>> {
    let port = state.port;
    let bind_addr = state.bind_address.clone();
    let live_port = state.live_port.clone();

    let app = build_router(state);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port)).await?;
    let actual_port = listener.local_addr()?.port();
    if let Ok(mut p) = live_port.lock() {
        *p = actual_port;
    }

    log::info!(
        target: "lanes.server",
        "HTTP server listening on http://{}:{}",
        bind_addr,
        actual_port
    );

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!(target: "lanes.server", "HTTP server exited with error: {}", e);
        }
    });

    Ok(actual_port)
}
