//! Types for the conversion pipeline.

use serde::Serialize;

use crate::session::FileInfo;

/// Pipeline state machine. A conversion walks `Idle → Writing → Transcoding
/// → Reading → Done`; `Failed` is reachable from any non-idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPhase {
    Idle,
    Writing,
    Transcoding,
    Reading,
    Done,
    Failed,
}

impl ConversionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Writing => "writing",
            Self::Transcoding => "transcoding",
            Self::Reading => "reading",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Snapshot of the orchestrator for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub engine_loaded: bool,
    pub phase: ConversionPhase,
    pub status_line: String,
    /// Whether a conversion is in flight (the trigger is disarmed).
    pub converting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<FileInfo>,
    pub has_result: bool,
}

/// Returned to the caller after a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub job_id: String,
    pub download_name: String,
    pub output_size_bytes: u64,
    /// Output size in MB with two decimals.
    pub output_size_label: String,
    pub elapsed_ms: u64,
}
