//! Persistence seam for cache and cost state
//!
//! Cache entries and the cost record are small JSON documents. The trait
//! keeps the client testable with an in-memory store; the filesystem
//! implementation accepts last-writer-wins semantics across processes.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Key/value persistence for client state
pub trait Storage: Send + Sync {
    /// Read the value for a key, or `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write (or overwrite) the value for a key
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// List all stored keys
    fn list(&self) -> Result<Vec<String>>;

    /// Remove a key, ignoring absence
    fn remove(&self, key: &str) -> Result<()>;
}

/// Filesystem-backed storage, one file per key
#[derive(Debug)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::Storage(format!("mkdir {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are hex hashes or fixed names; keep them flat under root.
        self.root.join(format!("{key}.json"))
    }
}

impl Storage for FsStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                debug!(key = %key, error = %e, "Unreadable storage entry treated as absent");
                Ok(None)
            }
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .map_err(|e| Error::Storage(format!("write {}: {e}", path.display())))
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| Error::Storage(format!("read_dir {}: {e}", self.root.display())))?;

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(keys)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("remove {}: {e}", path.display()))),
        }
    }
}

/// In-memory storage for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.keys().cloned().collect())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.put("a", "hello").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("hello"));

        store.put("a", "world").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("world"));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        // Removing again is not an error
        store.remove("a").unwrap();
    }

    #[test]
    fn test_fs_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path()).unwrap();

        store.put("entry", r#"{"k":1}"#).unwrap();
        assert_eq!(store.get("entry").unwrap().as_deref(), Some(r#"{"k":1}"#));

        let keys = store.list().unwrap();
        assert_eq!(keys, vec!["entry".to_string()]);

        store.remove("entry").unwrap();
        assert_eq!(store.get("entry").unwrap(), None);
    }

    #[test]
    fn test_fs_storage_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path()).unwrap();
        assert_eq!(store.get("nope").unwrap(), None);
    }
}
