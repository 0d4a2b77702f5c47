//! Error types for the engine module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a transcoding engine binding.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine binary not found.
    #[error("engine binary not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// Engine initialization failed.
    #[error("engine failed to load: {reason}")]
    LoadFailed { reason: String },

    /// An operation was attempted before `load` succeeded.
    #[error("engine is not loaded")]
    NotLoaded,

    /// Virtual file names must be single path components.
    #[error("invalid virtual file name: {name:?}")]
    InvalidFileName { name: String },

    /// The named virtual file does not exist.
    #[error("virtual file not found: {name}")]
    FileNotFound { name: String },

    /// The engine run finished unsuccessfully.
    #[error("engine exec failed: {reason}")]
    ExecFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// I/O error talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a new load failed error.
    pub fn load_failed(reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new exec failed error with captured stderr output.
    pub fn exec_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ExecFailed {
            reason: reason.into(),
            stderr,
        }
    }
}
