//! File intake handlers: the upload target and the session status line.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use wavepress_core::{FileInfo, OrchestratorStatus};

use crate::metrics::UPLOADS_TOTAL;
use crate::state::AppState;

/// Error response
#[derive(Debug, Serialize)]
pub struct IntakeErrorResponse {
    pub error: String,
}

type IntakeFailure = (StatusCode, Json<IntakeErrorResponse>);

fn intake_failure(status: StatusCode, error: impl Into<String>) -> IntakeFailure {
    (
        status,
        Json(IntakeErrorResponse {
            error: error.into(),
        }),
    )
}

/// Accept a file from the picker or drop target.
///
/// Expects a multipart body with a `file` field. Non-audio files are rejected
/// with 415 and leave the current selection untouched; acceptance replaces
/// the selection and clears the previous result and log.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<FileInfo>, IntakeFailure> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| intake_failure(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("audio").to_string();
        let media_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| intake_failure(StatusCode::BAD_REQUEST, e.to_string()))?;

        return match state
            .orchestrator()
            .select_file(file_name, media_type, bytes.to_vec())
            .await
        {
            Ok(info) => {
                UPLOADS_TOTAL.with_label_values(&["accepted"]).inc();
                Ok(Json(info))
            }
            Err(e) => {
                UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
                Err(intake_failure(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    e.to_string(),
                ))
            }
        };
    }

    Err(intake_failure(
        StatusCode::BAD_REQUEST,
        "missing \"file\" field",
    ))
}

/// The page's status line: selection summary, phase, engine readiness.
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<OrchestratorStatus> {
    Json(state.orchestrator().status().await)
}
