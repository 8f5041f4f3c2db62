pub mod auth;
pub mod config;
pub mod game;
pub mod metrics;
pub mod repository;

pub use game::messages;

use axum::{
    Json, Router,
    extract::{Path, Query, State, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use game::GameManager;
use metrics::MetricsSnapshot;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<GameManager>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.manager.metrics.snapshot())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(match_id): Path<String>,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let limit = state.manager.config.max_message_bytes;
    // The router enforces `limit` itself and answers with an error frame
    ws.max_message_size(limit.saturating_mul(4))
        .on_upgrade(move |socket| game::handle_socket(socket, match_id, params.token, state.manager))
}

pub fn app(manager: Arc<GameManager>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws/:match_id", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(AppState { manager })
}
