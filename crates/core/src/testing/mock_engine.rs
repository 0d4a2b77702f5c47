//! Mock engine for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::engine::{EngineError, TranscodeEngine};

/// A recorded engine call, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Load,
    Write { name: String, len: usize },
    Exec { args: Vec<String> },
    Read { name: String },
    Delete { name: String },
}

/// Mock implementation of the `TranscodeEngine` trait.
///
/// Provides controllable behavior for testing:
/// - Records every call for assertions
/// - Scripted virtual filesystem (`exec` materializes configured output)
/// - Per-operation error injection
/// - Scripted log-line emission during `exec`
///
/// Starts loaded; use [`MockEngine::unloaded`] to exercise the startup flow.
pub struct MockEngine {
    loaded: AtomicBool,
    calls: Arc<RwLock<Vec<EngineCall>>>,
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// File written into the virtual filesystem when `exec` runs.
    exec_output: Arc<RwLock<Option<(String, Vec<u8>)>>>,
    load_error: Arc<RwLock<Option<EngineError>>>,
    write_error: Arc<RwLock<Option<EngineError>>>,
    exec_error: Arc<RwLock<Option<EngineError>>>,
    read_error: Arc<RwLock<Option<EngineError>>>,
    log_lines: Arc<RwLock<Vec<String>>>,
    /// Simulated exec duration in milliseconds.
    exec_duration_ms: Arc<RwLock<u64>>,
    log_tx: broadcast::Sender<String>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Creates a mock engine that is already loaded.
    pub fn new() -> Self {
        let (log_tx, _) = broadcast::channel(256);
        Self {
            loaded: AtomicBool::new(true),
            calls: Arc::new(RwLock::new(Vec::new())),
            files: Arc::new(RwLock::new(HashMap::new())),
            exec_output: Arc::new(RwLock::new(Some((
                "output.mp3".to_string(),
                vec![0u8; 1024],
            )))),
            load_error: Arc::new(RwLock::new(None)),
            write_error: Arc::new(RwLock::new(None)),
            exec_error: Arc::new(RwLock::new(None)),
            read_error: Arc::new(RwLock::new(None)),
            log_lines: Arc::new(RwLock::new(Vec::new())),
            exec_duration_ms: Arc::new(RwLock::new(0)),
            log_tx,
        }
    }

    /// Creates a mock engine that has not been loaded yet.
    pub fn unloaded() -> Self {
        let engine = Self::new();
        engine.loaded.store(false, Ordering::SeqCst);
        engine
    }

    /// All recorded calls, in order.
    pub async fn recorded_calls(&self) -> Vec<EngineCall> {
        self.calls.read().await.clone()
    }

    /// Number of `exec` calls performed.
    pub async fn exec_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, EngineCall::Exec { .. }))
            .count()
    }

    /// Snapshot of the virtual filesystem.
    pub async fn virtual_files(&self) -> HashMap<String, Vec<u8>> {
        self.files.read().await.clone()
    }

    /// Sets the file `exec` writes into the virtual filesystem.
    pub async fn set_exec_output(&self, name: impl Into<String>, bytes: Vec<u8>) {
        *self.exec_output.write().await = Some((name.into(), bytes));
    }

    /// Makes `exec` produce nothing, so a following read fails.
    pub async fn clear_exec_output(&self) {
        *self.exec_output.write().await = None;
    }

    /// Lines emitted to log subscribers while `exec` runs.
    pub async fn set_log_lines(&self, lines: Vec<String>) {
        *self.log_lines.write().await = lines;
    }

    /// Sets the simulated exec duration.
    pub async fn set_exec_duration(&self, duration: std::time::Duration) {
        *self.exec_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Configures the next `load` to fail.
    pub async fn fail_next_load(&self, error: EngineError) {
        *self.load_error.write().await = Some(error);
    }

    /// Configures the next `write_file` to fail.
    pub async fn fail_next_write(&self, error: EngineError) {
        *self.write_error.write().await = Some(error);
    }

    /// Configures the next `exec` to fail.
    pub async fn fail_next_exec(&self, error: EngineError) {
        *self.exec_error.write().await = Some(error);
    }

    /// Configures the next `read_file` to fail.
    pub async fn fail_next_read(&self, error: EngineError) {
        *self.read_error.write().await = Some(error);
    }

    async fn record(&self, call: EngineCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl TranscodeEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Load).await;
        if let Some(err) = self.load_error.write().await.take() {
            return Err(err);
        }
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        self.record(EngineCall::Write {
            name: name.to_string(),
            len: bytes.len(),
        })
        .await;
        if !self.is_loaded() {
            return Err(EngineError::NotLoaded);
        }
        if let Some(err) = self.write_error.write().await.take() {
            return Err(err);
        }
        self.files
            .write()
            .await
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.record(EngineCall::Read {
            name: name.to_string(),
        })
        .await;
        if !self.is_loaded() {
            return Err(EngineError::NotLoaded);
        }
        if let Some(err) = self.read_error.write().await.take() {
            return Err(err);
        }
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound {
                name: name.to_string(),
            })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.record(EngineCall::Delete {
            name: name.to_string(),
        })
        .await;
        if !self.is_loaded() {
            return Err(EngineError::NotLoaded);
        }
        self.files
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::FileNotFound {
                name: name.to_string(),
            })
    }

    async fn exec(&self, args: &[String]) -> Result<(), EngineError> {
        self.record(EngineCall::Exec {
            args: args.to_vec(),
        })
        .await;
        if !self.is_loaded() {
            return Err(EngineError::NotLoaded);
        }

        // Lines flow before the run resolves, like a real engine.
        for line in self.log_lines.read().await.iter() {
            let _ = self.log_tx.send(line.clone());
        }

        let duration_ms = *self.exec_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(duration_ms)).await;
        }

        if let Some(err) = self.exec_error.write().await.take() {
            return Err(err);
        }

        if let Some((name, bytes)) = self.exec_output.read().await.clone() {
            self.files.write().await.insert(name, bytes);
        }
        Ok(())
    }

    fn subscribe_logs(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }
}
