//! Durable key-value storage behind the history list.
//!
//! [`KeyValueStore`] is the seam: the history only needs `get` and `set` of
//! a JSON value under one key.  [`JsonFileStore`] keeps all keys in a single
//! JSON object file; [`MemoryStore`] keeps them in a shared map for tests
//! and for running without a writable config directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage file {0} does not contain a JSON object")]
    NotAnObject(PathBuf),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// Minimal durable key-value interface.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` if the key was never set.
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// All keys in one pretty-printed JSON object file.
///
/// Writes go to a sibling `.tmp` file that is then renamed over the
/// original, so a crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_object(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(StorageError::NotAnObject(self.path.clone())),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.read_object()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        // Other keys survive.  A file that is not a JSON object is replaced;
        // an I/O failure is reported and the file left alone.
        let mut map = match self.read_object() {
            Ok(map) => map,
            Err(e @ (StorageError::Json(_) | StorageError::NotAnObject(_))) => {
                log::warn!(
                    "history: replacing unreadable store {}: {e}",
                    self.path.display()
                );
                Map::new()
            }
            Err(e) => return Err(e),
        };
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&Value::Object(map))?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store.  Clones share the same map, so a test can hand one
/// clone to a history and inspect or reload through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let map = self.map.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut map = self.map.lock().map_err(|_| StorageError::Poisoned)?;
        map.insert(key.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_file_has_no_keys() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.get("anything").unwrap().is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path().join("nested").join("store.json"));

        store.set("k", json!([1.5, 2.5])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!([1.5, 2.5])));
        assert!(!dir.path().join("nested").join("store.json.tmp").exists());
    }

    #[test]
    fn set_preserves_other_keys() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path().join("store.json"));

        store.set("a", json!(1)).unwrap();
        store.set("b", json!(2)).unwrap();
        store.set("a", json!(3)).unwrap();

        assert_eq!(store.get("a").unwrap(), Some(json!(3)));
        assert_eq!(store.get("b").unwrap(), Some(json!(2)));
    }

    #[test]
    fn garbage_file_errors_on_get_and_is_replaced_on_set() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("k"), Err(StorageError::Json(_))));

        store.set("k", json!([4.0])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!([4.0])));
    }

    #[test]
    fn unreadable_path_is_not_overwritten() {
        let dir = tempdir().expect("temp dir");
        // A directory where the file should be: reading fails with an I/O
        // error rather than a parse error.
        let path = dir.path().join("store.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), "other data").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.set("k", json!([1.0])), Err(StorageError::Io(_))));
        assert!(path.is_dir());
        assert!(path.join("keep.txt").exists());
        assert!(!dir.path().join("store.json.tmp").exists());
    }

    #[test]
    fn non_object_file_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("k"), Err(StorageError::NotAnObject(_))));
    }

    #[test]
    fn memory_store_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", json!("v")).unwrap();
        assert_eq!(b.get("k").unwrap(), Some(json!("v")));
        assert!(b.get("other").unwrap().is_none());
    }
}
