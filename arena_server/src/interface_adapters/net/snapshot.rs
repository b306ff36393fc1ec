use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::SnapshotDto;
use crate::interface_adapters::state::AppState;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

/// `GET /snapshot`: the current game state in the same shape as `GAME_STATE_UPDATE`.
pub async fn snapshot_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.game.snapshot().await {
        Ok(snapshot) => Json(SnapshotDto::from(&snapshot)).into_response(),
        Err(err) => {
            warn!(error = %err, "snapshot requested while game loop is down");
            error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
    }
}
