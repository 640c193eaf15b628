//! Page-local persisted state
//!
//! The tracker keeps two values across reloads of the same page, the way a
//! browser keeps them in local storage: the throttle timestamp and the
//! session start time. Values are plain strings keyed by name.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Key holding the epoch-millisecond time of the last send attempt.
pub const LAST_SENT_KEY: &str = "lastTrackingTime";

/// Key holding the ISO-8601 start time of the current session.
pub const START_TIME_KEY: &str = "startTime";

/// String key/value storage that survives page reloads.
///
/// There is no cross-tab coordination: two tabs writing the same key race and
/// the last write wins.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store, for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a flat JSON object in a single file.
///
/// A missing or corrupt file reads as empty. Every `set` rewrites the file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(values) => Some(values),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt client store");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content)
            .map_err(|e| Error::Store(format!("failed to write {:?}: {}", self.path, e)))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_set_get() {
        let store = MemoryStore::new();
        assert!(store.get(LAST_SENT_KEY).is_none());
        store.set(LAST_SENT_KEY, "42").unwrap();
        assert_eq!(store.get(LAST_SENT_KEY).as_deref(), Some("42"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/store.json");

        let store = FileStore::open(&path);
        store.set(START_TIME_KEY, "2025-01-01T00:00:00.000Z").unwrap();
        drop(store);

        let reopened = FileStore::open(&path);
        assert_eq!(
            reopened.get(START_TIME_KEY).as_deref(),
            Some("2025-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn test_file_store_corrupt_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path);
        assert!(store.get(LAST_SENT_KEY).is_none());
    }
}
