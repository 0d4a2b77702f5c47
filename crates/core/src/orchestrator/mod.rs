//! Conversion pipeline orchestration.
//!
//! Sequences one file at a time through the engine: write the input into the
//! virtual filesystem, run the fixed transcode command, read the artifact
//! back. At most one conversion is in flight; the trigger guard re-arms on
//! every exit path, success or failure.

mod config;
mod types;

pub use config::ConversionConfig;
pub use types::{ConversionPhase, ConversionReport, OrchestratorStatus};

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{EngineError, TranscodeEngine};
use crate::level::CompressionLevel;
use crate::logsink::LogSink;
use crate::session::{Artifact, FileInfo, IntakeConfig, IntakeError, SelectedAudio, Session};

/// Fixed output name inside the engine's virtual filesystem.
const OUTPUT_NAME: &str = "output.mp3";

/// Invoked on every phase or status-line transition, for live fan-out.
pub type StatusCallback = Arc<dyn Fn(ConversionPhase, &str) + Send + Sync>;

/// Errors returned by the convert trigger.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Nothing is selected; the trigger does nothing.
    #[error("no file selected")]
    NoFileSelected,

    /// A conversion is already in flight.
    #[error("a conversion is already running")]
    Busy,

    /// The pipeline failed; the engine's message passes through.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Drives the engine for one file at a time and mirrors progress to the
/// status line and log sink.
///
/// The engine is held as a trait object so any compliant binding can be
/// swapped in without touching the pipeline.
pub struct Orchestrator {
    engine: Arc<dyn TranscodeEngine>,
    conversion: ConversionConfig,
    intake: IntakeConfig,
    session: Mutex<Session>,
    phase: RwLock<ConversionPhase>,
    status_line: RwLock<String>,
    /// Held for the duration of a conversion; `try_lock` failure is the
    /// disabled-trigger equivalent.
    trigger: Mutex<()>,
    sink: LogSink,
    status_callback: Option<StatusCallback>,
}

impl Orchestrator {
    /// Creates an orchestrator around a shared engine handle. Must be called
    /// from within a tokio runtime: a background task is spawned to forward
    /// engine log lines into the sink.
    pub fn new(
        engine: Arc<dyn TranscodeEngine>,
        conversion: ConversionConfig,
        intake: IntakeConfig,
    ) -> Self {
        let sink = LogSink::new();
        spawn_log_forwarder(engine.subscribe_logs(), sink.clone());
        Self {
            engine,
            conversion,
            intake,
            session: Mutex::new(Session::new()),
            phase: RwLock::new(ConversionPhase::Idle),
            status_line: RwLock::new("Loading engine...".to_string()),
            trigger: Mutex::new(()),
            sink,
            status_callback: None,
        }
    }

    /// Sets the callback fired on phase/status transitions.
    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.status_callback = Some(callback);
        self
    }

    pub fn log_sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn engine(&self) -> &Arc<dyn TranscodeEngine> {
        &self.engine
    }

    /// One-shot engine initialization, fired at startup. A failure is
    /// surfaced and never retried; the trigger stays usable and conversions
    /// will fail downstream instead.
    pub async fn load_engine(&self) {
        self.set_status(ConversionPhase::Idle, "Loading engine...")
            .await;
        self.sink
            .append(format!("loading engine: {}", self.engine.name()))
            .await;

        match self.engine.load().await {
            Ok(()) => {
                self.set_status(ConversionPhase::Idle, "Engine loaded. Ready.")
                    .await;
                self.sink.append("engine loaded").await;
                info!("engine {} loaded", self.engine.name());
            }
            Err(e) => {
                self.set_status(ConversionPhase::Idle, format!("Error loading engine: {e}"))
                    .await;
                self.append_error_chain(&e).await;
                warn!("engine load failed: {e}");
            }
        }
    }

    /// File intake. On success the new selection replaces the previous one
    /// and the prior artifact and log pane are cleared; on rejection nothing
    /// changes.
    pub async fn select_file(
        &self,
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<FileInfo, IntakeError> {
        let info = {
            let mut session = self.session.lock().await;
            session.select(
                file_name,
                media_type,
                bytes,
                self.intake.size_warning_bytes(),
            )?
        };

        self.sink.clear().await;
        self.set_status(
            ConversionPhase::Idle,
            format!("Selected: {} ({} MB)", info.file_name, info.size_label),
        )
        .await;
        if let Some(warning) = &info.size_warning {
            self.sink.append(warning.clone()).await;
        }
        Ok(info)
    }

    /// Snapshot for status displays.
    pub async fn status(&self) -> OrchestratorStatus {
        let (selected, has_result) = {
            let session = self.session.lock().await;
            (
                session.file_info(self.intake.size_warning_bytes()),
                session.has_artifact(),
            )
        };
        OrchestratorStatus {
            engine_loaded: self.engine.is_loaded(),
            phase: *self.phase.read().await,
            status_line: self.status_line.read().await.clone(),
            converting: self.trigger.try_lock().is_err(),
            selected,
            has_result,
        }
    }

    /// The last conversion result, if one is available.
    pub async fn artifact(&self) -> Option<Artifact> {
        self.session.lock().await.artifact()
    }

    /// Runs the pipeline for the selected file.
    ///
    /// With no file selected, or while another conversion holds the trigger,
    /// this is a no-op: no state transition and no engine call. Otherwise the
    /// call resolves when the pipeline finishes, and the trigger re-arms on
    /// every exit path.
    pub async fn convert(&self, level: CompressionLevel) -> Result<ConversionReport, ConvertError> {
        let selected = { self.session.lock().await.selected() };
        let Some(input) = selected else {
            return Err(ConvertError::NoFileSelected);
        };
        let Ok(_guard) = self.trigger.try_lock() else {
            return Err(ConvertError::Busy);
        };

        let job_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        self.session.lock().await.clear_artifact();
        self.set_status(ConversionPhase::Writing, "Converting...").await;
        self.sink
            .append(format!(
                "job {job_id}: {} -> {OUTPUT_NAME} at {}",
                input.file_name,
                level.bitrate()
            ))
            .await;

        match self.run_pipeline(&input, level).await {
            Ok(artifact) => {
                let report = ConversionReport {
                    job_id: job_id.clone(),
                    download_name: artifact.download_name.clone(),
                    output_size_bytes: artifact.size_bytes,
                    output_size_label: artifact.size_label.clone(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
                self.session.lock().await.set_artifact(artifact);
                self.set_status(ConversionPhase::Done, "Conversion complete!")
                    .await;
                self.sink
                    .append(format!(
                        "job {job_id}: done, {} MB in {} ms",
                        report.output_size_label, report.elapsed_ms
                    ))
                    .await;
                info!("conversion {job_id} finished in {} ms", report.elapsed_ms);
                Ok(report)
            }
            Err(e) => {
                let mut status = format!("Conversion failed: {e}");
                if mentions_memory_pressure(&e) {
                    status.push_str(". Try a smaller file.");
                }
                self.set_status(ConversionPhase::Failed, status).await;
                self.append_error_chain(&e).await;
                warn!("conversion {job_id} failed: {e}");
                Err(e.into())
            }
        }
        // _guard drops here, re-arming the trigger after success and failure
        // alike.
    }

    async fn run_pipeline(
        &self,
        input: &SelectedAudio,
        level: CompressionLevel,
    ) -> Result<Artifact, EngineError> {
        let input_name = virtual_input_name(&input.file_name);

        self.engine.write_file(&input_name, &input.bytes).await?;

        self.set_phase(ConversionPhase::Transcoding).await;
        let args = transcode_args(&input_name, level, self.conversion.strip_video_streams);
        self.engine.exec(&args).await?;

        self.set_phase(ConversionPhase::Reading).await;
        let bytes = self.engine.read_file(OUTPUT_NAME).await?;

        if self.conversion.cleanup_virtual_files {
            // Best effort; a stale entry only costs scratch space.
            let _ = self.engine.delete_file(&input_name).await;
            let _ = self.engine.delete_file(OUTPUT_NAME).await;
        }

        Ok(Artifact::mp3(&input.file_name, bytes))
    }

    async fn set_status(&self, phase: ConversionPhase, status: impl Into<String>) {
        let status = status.into();
        *self.phase.write().await = phase;
        *self.status_line.write().await = status.clone();
        if let Some(callback) = &self.status_callback {
            callback(phase, &status);
        }
    }

    async fn set_phase(&self, phase: ConversionPhase) {
        *self.phase.write().await = phase;
        if let Some(callback) = &self.status_callback {
            let status = self.status_line.read().await.clone();
            callback(phase, &status);
        }
    }

    /// Appends the error and its source chain to the sink (the closest thing
    /// to the stack trace the page variant logged).
    async fn append_error_chain(&self, err: &(dyn std::error::Error + Send + Sync + 'static)) {
        // Walk the borrowed source chain up front so no `&dyn Error` (which is
        // not `Send`) is held across an `.await`; then flush the collected
        // lines to the sink in order.
        let mut lines = vec![format!("error: {err}")];
        let mut source = err.source();
        while let Some(cause) = source {
            lines.push(format!("  caused by: {cause}"));
            source = cause.source();
        }
        for line in lines {
            self.sink.append(line).await;
        }
    }
}

fn spawn_log_forwarder(mut rx: broadcast::Receiver<String>, sink: LogSink) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(line) => sink.append(line).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("engine log stream lagged, dropped {n} lines");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Derives the virtual input name, preserving the original extension:
/// `"song.flac"` becomes `input.flac`, `"noext"` stays `input`.
fn virtual_input_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => format!("input.{ext}"),
        None => "input".to_string(),
    }
}

/// The fixed transcode profile: `-i <input> [-vn] -b:a <bitrate> output.mp3`.
fn transcode_args(input_name: &str, level: CompressionLevel, strip_video: bool) -> Vec<String> {
    let mut args = vec!["-i".to_string(), input_name.to_string()];
    if strip_video {
        args.push("-vn".to_string());
    }
    args.extend([
        "-b:a".to_string(),
        level.bitrate().to_string(),
        OUTPUT_NAME.to_string(),
    ]);
    args
}

/// Heuristic behind the "try a smaller file" hint.
fn mentions_memory_pressure(err: &EngineError) -> bool {
    let mut message = err.to_string();
    if let EngineError::ExecFailed {
        stderr: Some(tail), ..
    } = err
    {
        message.push('\n');
        message.push_str(tail);
    }
    let message = message.to_ascii_lowercase();
    message.contains("memory") || message.contains("alloc") || message.contains("oom")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_input_name_preserves_extension() {
        assert_eq!(virtual_input_name("song.flac"), "input.flac");
        assert_eq!(virtual_input_name("track.mp3"), "input.mp3");
        // The last dot wins for multi-dot names.
        assert_eq!(virtual_input_name("archive.tar.gz"), "input.gz");
    }

    #[test]
    fn test_virtual_input_name_without_extension() {
        assert_eq!(virtual_input_name("noext"), "input");
    }

    #[test]
    fn test_transcode_args_profile() {
        let args = transcode_args("input.flac", CompressionLevel::Balanced, true);
        assert_eq!(
            args,
            vec!["-i", "input.flac", "-vn", "-b:a", "128k", "output.mp3"]
        );
    }

    #[test]
    fn test_transcode_args_without_vn() {
        let args = transcode_args("input.wav", CompressionLevel::VeryLow, false);
        assert_eq!(args, vec!["-i", "input.wav", "-b:a", "32k", "output.mp3"]);
    }

    #[test]
    fn test_memory_pressure_heuristic() {
        let oom = EngineError::exec_failed("abort", Some("Cannot allocate memory".to_string()));
        assert!(mentions_memory_pressure(&oom));

        let plain = EngineError::exec_failed("ffmpeg exited with code Some(1)", None);
        assert!(!mentions_memory_pressure(&plain));
    }
}
