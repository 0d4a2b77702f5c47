//! Trait definitions for the engine module.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::error::EngineError;

/// An external transcoding engine with a private virtual filesystem.
///
/// Five operations make up the whole boundary: `load`, `write_file`, `exec`,
/// `read_file` and the log subscription (`delete_file` is the cleanup
/// counterpart of `write_file`). The orchestrator never looks past this
/// surface, so any compliant binding can be swapped in.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Returns the name of this engine binding.
    fn name(&self) -> &str;

    /// Initializes the engine. Called once at startup; calling it again after
    /// a successful load is a cheap no-op.
    async fn load(&self) -> Result<(), EngineError>;

    /// Whether `load` has completed successfully.
    fn is_loaded(&self) -> bool;

    /// Copies `bytes` into the virtual filesystem under `name`.
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError>;

    /// Reads a file back out of the virtual filesystem.
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Removes a file from the virtual filesystem.
    async fn delete_file(&self, name: &str) -> Result<(), EngineError>;

    /// Runs the engine with the given argument list and resolves when it
    /// finishes. There is no cancellation and no timeout: a hung engine hangs
    /// the caller.
    async fn exec(&self, args: &[String]) -> Result<(), EngineError>;

    /// Subscribes to raw diagnostic lines emitted while `exec` runs. The
    /// lines are unstructured text meant for display, not for parsing.
    fn subscribe_logs(&self) -> broadcast::Receiver<String>;
}
