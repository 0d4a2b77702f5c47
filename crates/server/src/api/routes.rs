use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

use super::{convert, handlers, intake, logs, middleware, ws};
use crate::state::AppState;

/// Upload body cap. Well above the soft intake warning threshold; the
/// warning is advisory, not a rejection.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Front-end static files path (configurable via env)
    let frontend_dir =
        std::env::var("FRONTEND_DIR").unwrap_or_else(|_| "frontend/dist".to_string());

    // API routes
    let api_routes = Router::new()
        // Health, config, metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // File intake (the picker / drop target)
        .route("/file", post(intake::upload_file))
        .route("/session", get(intake::get_session))
        // Conversion trigger and result download
        .route("/convert", post(convert::trigger_convert))
        .route("/result", get(convert::download_result))
        // Log pane
        .route("/logs", get(logs::list_logs))
        .route("/ws", get(ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum_middleware::from_fn(middleware::metrics_middleware))
        .with_state(state);

    // Serve the front-end with SPA fallback
    let index_path = format!("{}/index.html", frontend_dir);
    let serve_dir = ServeDir::new(&frontend_dir).fallback(ServeFile::new(&index_path));

    Router::new()
        .nest("/api/v1", api_routes)
        .fallback_service(serve_dir)
}
