//! Configuration for the conversion pipeline.

use serde::{Deserialize, Serialize};

/// Tunables for the fixed transcode profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Pass `-vn` so embedded cover-art/video streams are dropped from the
    /// output.
    #[serde(default = "default_strip_video")]
    pub strip_video_streams: bool,

    /// Delete virtual files after each job. Off by default: entries are left
    /// behind across jobs and reclaimed only when the process exits.
    #[serde(default)]
    pub cleanup_virtual_files: bool,
}

fn default_strip_video() -> bool {
    true
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            strip_video_streams: default_strip_video(),
            cleanup_virtual_files: false,
        }
    }
}
