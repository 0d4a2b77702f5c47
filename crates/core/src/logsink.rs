//! Append-only status/log sink with live fan-out.
//!
//! Receives pipeline milestones and the raw diagnostic lines the engine
//! emits during a run. Lines are display text only; nothing downstream
//! parses them (in particular, no progress is derived from them).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Capacity of the live fan-out channel.
const FANOUT_CAPACITY: usize = 1024;

/// One timestamped log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub line: String,
}

/// Append-only log buffer. Cloning is cheap and shares the buffer.
#[derive(Debug, Clone)]
pub struct LogSink {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    lines: RwLock<Vec<LogLine>>,
    tx: broadcast::Sender<LogLine>,
}

impl LogSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FANOUT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                lines: RwLock::new(Vec::new()),
                tx,
            }),
        }
    }

    /// Appends a line and fans it out to live subscribers.
    pub async fn append(&self, line: impl Into<String>) {
        let entry = LogLine {
            at: Utc::now(),
            line: line.into(),
        };
        self.inner.lines.write().await.push(entry.clone());
        // Send errors just mean no one is listening.
        let _ = self.inner.tx.send(entry);
    }

    /// Snapshot of the whole buffer.
    pub async fn lines(&self) -> Vec<LogLine> {
        self.inner.lines.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lines.read().await.is_empty()
    }

    /// Empties the buffer. Live subscribers are unaffected.
    pub async fn clear(&self) {
        self.inner.lines.write().await.clear();
    }

    /// Subscribes to lines appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogLine> {
        self.inner.tx.subscribe()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}
