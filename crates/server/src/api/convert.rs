//! Conversion trigger and result download handlers.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use wavepress_core::{CompressionLevel, ConversionReport, ConvertError};

use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION};
use crate::state::AppState;

/// Request body for triggering a conversion
#[derive(Debug, Default, Deserialize)]
pub struct ConvertRequest {
    /// Tier name (`high`, `balanced`, `low`, `very-low`). Unrecognized or
    /// missing values fall back to `balanced`.
    #[serde(default)]
    pub level: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ConvertErrorResponse {
    pub error: String,
}

/// Run the pipeline for the selected file. Resolves when the conversion
/// finishes; there is no cancellation.
pub async fn trigger_convert(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ConvertRequest>>,
) -> Result<Json<ConversionReport>, (StatusCode, Json<ConvertErrorResponse>)> {
    let level = body
        .and_then(|Json(req)| req.level)
        .map(|name| CompressionLevel::parse(&name))
        .unwrap_or_default();

    let started = Instant::now();
    match state.orchestrator().convert(level).await {
        Ok(report) => {
            CONVERSIONS_TOTAL.with_label_values(&["success"]).inc();
            CONVERSION_DURATION.observe(started.elapsed().as_secs_f64());
            Ok(Json(report))
        }
        Err(e @ (ConvertError::NoFileSelected | ConvertError::Busy)) => {
            // A click on a disabled trigger: nothing changed server side.
            Err((
                StatusCode::CONFLICT,
                Json(ConvertErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
        Err(e) => {
            CONVERSIONS_TOTAL.with_label_values(&["failure"]).inc();
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ConvertErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// Download the last conversion result (the generated link's target).
pub async fn download_result(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator().artifact().await {
        Some(artifact) => {
            let headers = [
                (header::CONTENT_TYPE, artifact.media_type.clone()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", artifact.download_name),
                ),
            ];
            (headers, artifact.bytes.as_ref().clone()).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ConvertErrorResponse {
                error: "no conversion result available".to_string(),
            }),
        )
            .into_response(),
    }
}
