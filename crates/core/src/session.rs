//! Single-slot session state and file intake.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Renders a byte count as MB with two decimals, e.g. `"3.42"`.
pub fn size_label_mb(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_MB)
}

/// Configuration for file intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Soft-warning threshold for large inputs, in MB. Oversized files are
    /// still accepted; the warning reflects the engine's memory ceiling.
    #[serde(default = "default_size_warning_mb")]
    pub size_warning_mb: u64,
}

fn default_size_warning_mb() -> u64 {
    200
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            size_warning_mb: default_size_warning_mb(),
        }
    }
}

impl IntakeConfig {
    /// The warning threshold in bytes.
    pub fn size_warning_bytes(&self) -> u64 {
        self.size_warning_mb * 1_048_576
    }
}

/// Errors raised by file intake.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Only audio-typed files are accepted.
    #[error("not an audio file: {media_type}")]
    NotAudio { media_type: String },
}

/// A user-selected input file, pending conversion.
#[derive(Debug, Clone)]
pub struct SelectedAudio {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub selected_at: DateTime<Utc>,
}

/// Summary of the current selection, shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub file_name: String,
    pub size_bytes: u64,
    /// Size in MB with two decimals.
    pub size_label: String,
    /// Soft warning for very large files; never blocks the selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_warning: Option<String>,
}

/// A finished conversion output, ready for download.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Arc<Vec<u8>>,
    pub media_type: String,
    pub download_name: String,
    pub size_bytes: u64,
    /// Size in MB with two decimals.
    pub size_label: String,
    pub produced_at: DateTime<Utc>,
}

impl Artifact {
    /// Wraps transcoded bytes as a downloadable mp3, deriving the download
    /// name from the input's base name (everything before the first dot).
    pub fn mp3(input_file_name: &str, bytes: Vec<u8>) -> Self {
        let base = input_file_name.split('.').next().unwrap_or_default();
        let size_bytes = bytes.len() as u64;
        Self {
            size_label: size_label_mb(size_bytes),
            bytes: Arc::new(bytes),
            media_type: "audio/mp3".to_string(),
            download_name: format!("compressed_{base}.mp3"),
            size_bytes,
            produced_at: Utc::now(),
        }
    }
}

/// One mutable slot: at most one pending input file and at most one result.
/// Lives for the process lifetime, never persisted.
#[derive(Debug, Default)]
pub struct Session {
    selected: Option<Arc<SelectedAudio>>,
    artifact: Option<Artifact>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// File intake. Rejects non-audio media types without touching the
    /// current selection; acceptance replaces the selection and drops the
    /// previous artifact.
    pub fn select(
        &mut self,
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
        size_warning_bytes: u64,
    ) -> Result<FileInfo, IntakeError> {
        let media_type = media_type.into();
        if !media_type.starts_with("audio/") {
            return Err(IntakeError::NotAudio { media_type });
        }

        let file_name = file_name.into();
        let size_bytes = bytes.len() as u64;
        self.selected = Some(Arc::new(SelectedAudio {
            file_name: file_name.clone(),
            media_type,
            bytes,
            selected_at: Utc::now(),
        }));
        self.artifact = None;

        Ok(file_info(&file_name, size_bytes, size_warning_bytes))
    }

    /// The pending input file, if any.
    pub fn selected(&self) -> Option<Arc<SelectedAudio>> {
        self.selected.clone()
    }

    /// Recomputes the selection summary (including the size warning, so it
    /// appears and disappears with the selection itself).
    pub fn file_info(&self, size_warning_bytes: u64) -> Option<FileInfo> {
        self.selected
            .as_ref()
            .map(|s| file_info(&s.file_name, s.bytes.len() as u64, size_warning_bytes))
    }

    pub fn artifact(&self) -> Option<Artifact> {
        self.artifact.clone()
    }

    pub fn has_artifact(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn set_artifact(&mut self, artifact: Artifact) {
        self.artifact = Some(artifact);
    }

    pub fn clear_artifact(&mut self) {
        self.artifact = None;
    }
}

fn file_info(file_name: &str, size_bytes: u64, size_warning_bytes: u64) -> FileInfo {
    let size_warning = (size_bytes > size_warning_bytes).then(|| {
        format!(
            "{} is {} MB; files over {} MB may exhaust the engine's memory",
            file_name,
            size_label_mb(size_bytes),
            size_warning_bytes / 1_048_576
        )
    });
    FileInfo {
        file_name: file_name.to_string(),
        size_bytes,
        size_label: size_label_mb(size_bytes),
        size_warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WARN_BYTES: u64 = 200 * 1_048_576;

    #[test]
    fn test_size_label() {
        assert_eq!(size_label_mb(0), "0.00");
        assert_eq!(size_label_mb(1_048_576), "1.00");
        assert_eq!(size_label_mb(3_590_324), "3.42");
    }

    #[test]
    fn test_select_accepts_audio() {
        let mut session = Session::new();
        let info = session
            .select("song.flac", "audio/flac", vec![0u8; 1_048_576], WARN_BYTES)
            .unwrap();

        assert_eq!(info.file_name, "song.flac");
        assert_eq!(info.size_bytes, 1_048_576);
        assert_eq!(info.size_label, "1.00");
        assert!(info.size_warning.is_none());
        assert!(session.selected().is_some());
    }

    #[test]
    fn test_select_rejects_non_audio_without_state_change() {
        let mut session = Session::new();
        session
            .select("song.flac", "audio/flac", vec![1, 2, 3], WARN_BYTES)
            .unwrap();

        let err = session
            .select("movie.mkv", "video/x-matroska", vec![4, 5, 6], WARN_BYTES)
            .unwrap_err();
        assert!(matches!(err, IntakeError::NotAudio { .. }));

        // Prior selection is untouched.
        let selected = session.selected().unwrap();
        assert_eq!(selected.file_name, "song.flac");
        assert_eq!(selected.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_select_warns_over_threshold() {
        let mut session = Session::new();
        let info = session
            .select("big.wav", "audio/wav", vec![0u8; 2048], 1024)
            .unwrap();
        assert!(info.size_warning.is_some());

        // Warning disappears when a small file replaces the big one.
        let info = session
            .select("small.wav", "audio/wav", vec![0u8; 512], 1024)
            .unwrap();
        assert!(info.size_warning.is_none());
    }

    #[test]
    fn test_select_clears_previous_artifact() {
        let mut session = Session::new();
        session
            .select("a.mp3", "audio/mpeg", vec![0u8; 10], WARN_BYTES)
            .unwrap();
        session.set_artifact(Artifact::mp3("a.mp3", vec![0u8; 5]));
        assert!(session.has_artifact());

        session
            .select("b.mp3", "audio/mpeg", vec![0u8; 10], WARN_BYTES)
            .unwrap();
        assert!(!session.has_artifact());
    }

    #[test]
    fn test_artifact_shape() {
        let artifact = Artifact::mp3("my.song.flac", vec![0u8; 2_097_152]);
        assert_eq!(artifact.media_type, "audio/mp3");
        assert_eq!(artifact.download_name, "compressed_my.mp3");
        assert_eq!(artifact.size_bytes, 2_097_152);
        assert_eq!(artifact.size_label, "2.00");
    }
}
