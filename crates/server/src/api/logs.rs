//! Log pane handler.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use wavepress_core::LogLine;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub lines: Vec<LogLine>,
}

/// The full log buffer, oldest first. Live updates flow over the WebSocket.
pub async fn list_logs(State(state): State<Arc<AppState>>) -> Json<LogsResponse> {
    Json(LogsResponse {
        lines: state.orchestrator().log_sink().lines().await,
    })
}
