//! Persistence of the last successful sync completion timestamp.
//!
//! The dashboard shows "last synced at" before any run happens in the
//! session, so the timestamp survives restarts. The store is a small
//! injected object rather than ambient global state, which keeps the
//! tracker testable.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Fixed key the timestamp is stored under.
pub const LAST_COMPLETED_KEY: &str = "last_sync_completed_at";

/// Store for the last successful completion timestamp.
///
/// Write-through on every terminal success; read once on mount.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// The last recorded successful completion, if any.
    fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Record a successful completion.
    async fn record_completion(&self, finished_at: DateTime<Utc>) -> Result<()>;
}

/// In-memory store, for tests and embedders that do their own persistence.
#[derive(Debug, Default)]
pub struct MemoryCompletionStore {
    value: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompletionStore for MemoryCompletionStore {
    fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(*self
            .value
            .lock()
            .map_err(|_| Error::Store("completion store lock poisoned".to_string()))?)
    }

    async fn record_completion(&self, finished_at: DateTime<Utc>) -> Result<()> {
        *self
            .value
            .lock()
            .map_err(|_| Error::Store("completion store lock poisoned".to_string()))? =
            Some(finished_at);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CompletionFile {
    #[serde(rename = "last_sync_completed_at")]
    last_completed_at: Option<DateTime<Utc>>,
}

/// JSON-file-backed store.
#[derive(Debug)]
pub struct FileCompletionStore {
    path: PathBuf,
}

impl FileCompletionStore {
    /// Create a store persisting to `path`. The file is created on first
    /// write; a missing file reads as "never completed".
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_file(&self) -> Result<CompletionFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| Error::Store(format!("invalid completion file: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CompletionFile::default()),
            Err(e) => Err(Error::Store(format!("failed to read completion file: {e}"))),
        }
    }
}

#[async_trait]
impl CompletionStore for FileCompletionStore {
    fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read_file()?.last_completed_at)
    }

    async fn record_completion(&self, finished_at: DateTime<Utc>) -> Result<()> {
        let contents = serde_json::to_string_pretty(&CompletionFile {
            last_completed_at: Some(finished_at),
        })
        .map_err(|e| Error::Store(format!("failed to encode completion file: {e}")))?;
        std::fs::write(&self.path, contents)
            .map_err(|e| Error::Store(format!("failed to write completion file: {e}")))
    }
}
