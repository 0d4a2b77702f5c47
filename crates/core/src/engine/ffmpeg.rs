//! FFmpeg process binding for the engine boundary.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::TranscodeEngine;

/// Capacity of the log fan-out channel. A slow subscriber drops lines rather
/// than stalling the engine.
const LOG_CHANNEL_CAPACITY: usize = 1024;

/// Trailing stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 40;

/// Engine binding that drives an `ffmpeg` process.
///
/// The scratch directory is the engine's virtual filesystem: virtual names
/// are single path components resolved inside it, and the process runs with
/// the scratch dir as its working directory so relative argv paths stay
/// inside the namespace.
pub struct FfmpegEngine {
    config: EngineConfig,
    loaded: AtomicBool,
    version: RwLock<Option<String>>,
    log_tx: broadcast::Sender<String>,
}

impl FfmpegEngine {
    /// Creates a new engine binding with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let (log_tx, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self {
            config,
            loaded: AtomicBool::new(false),
            version: RwLock::new(None),
            log_tx,
        }
    }

    /// Creates an engine binding with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// FFmpeg version banner captured during `load`, if loaded.
    pub async fn version(&self) -> Option<String> {
        self.version.read().await.clone()
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }

    /// Resolves a virtual file name inside the scratch directory. Names with
    /// path separators or parent-dir components would escape the namespace.
    fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(EngineError::InvalidFileName {
                name: name.to_string(),
            });
        }
        Ok(self.config.scratch_dir.join(name))
    }

    fn spawn_error(&self, e: std::io::Error) -> EngineError {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::BinaryNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        } else {
            EngineError::Io(e)
        }
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&self) -> Result<(), EngineError> {
        if self.is_loaded() {
            return Ok(());
        }

        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(EngineError::load_failed(format!(
                "ffmpeg -version exited with {}",
                output.status
            )));
        }

        let banner = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("")
            .to_string();

        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;

        *self.version.write().await = Some(banner);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::FileNotFound {
                    name: name.to_string(),
                }
            } else {
                EngineError::Io(e)
            }
        })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::FileNotFound {
                    name: name.to_string(),
                }
            } else {
                EngineError::Io(e)
            }
        })
    }

    async fn exec(&self, args: &[String]) -> Result<(), EngineError> {
        self.ensure_loaded()?;

        // Binding-level prelude: the caller's argv is relative to the scratch
        // dir and assumes a non-interactive engine that overwrites outputs.
        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(["-nostdin", "-y", "-loglevel", &self.config.ffmpeg_log_level])
            .args(&self.config.extra_ffmpeg_args)
            .args(args)
            .current_dir(&self.config.scratch_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::exec_failed("stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        while let Ok(Some(line)) = reader.next_line().await {
            debug!("ffmpeg: {}", line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.clone());
            // Send errors just mean no one is listening.
            let _ = self.log_tx.send(line);
        }

        let status = child.wait().await?;
        if !status.success() {
            let stderr_tail = tail.into_iter().collect::<Vec<_>>().join("\n");
            return Err(EngineError::exec_failed(
                format!("ffmpeg exited with code {:?}", status.code()),
                if stderr_tail.is_empty() {
                    None
                } else {
                    Some(stderr_tail)
                },
            ));
        }

        Ok(())
    }

    fn subscribe_logs(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }
}
