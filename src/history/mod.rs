//! Best-breath history, most recent first.
//!
//! The list lives under a single key ([`HISTORY_KEY`]) in a
//! [`KeyValueStore`].  It is read once at startup and afterwards only grows
//! through [`HistoryStore::append`], which writes the new list to storage
//! before adopting it in memory, so the two never disagree.
//!
//! ```rust
//! use vocal_trainer::history::{HistoryStore, MemoryStore};
//!
//! let storage = MemoryStore::new();
//! let mut history = HistoryStore::load(Box::new(storage.clone()));
//! history.append(12.3).unwrap();
//!
//! let reloaded = HistoryStore::load(Box::new(storage));
//! assert_eq!(reloaded.entries(), &[12.3]);
//! ```

pub mod storage;

use serde_json::Value;

pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};

/// Storage key for the persisted list.
pub const HISTORY_KEY: &str = "VocalTrainingHistory";

pub struct HistoryStore {
    store: Box<dyn KeyValueStore>,
    entries: Vec<f64>,
}

impl HistoryStore {
    /// Read the persisted list.
    ///
    /// Never fails: a missing key, an unreadable store or a value that is
    /// not a list all load as empty history, and individual entries that are
    /// not positive finite numbers are dropped.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let entries = match store.get(HISTORY_KEY) {
            Ok(Some(value)) => decode_entries(value),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("history: could not read stored history ({e}); starting empty");
                Vec::new()
            }
        };
        log::debug!("history: loaded {} entries", entries.len());
        Self { store, entries }
    }

    /// Prepend `seconds` and persist the whole list.
    ///
    /// Values that are not positive and finite are ignored.  On a storage
    /// error the in-memory list is left unchanged.
    pub fn append(&mut self, seconds: f64) -> Result<(), StorageError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            log::warn!("history: ignoring invalid result {seconds}");
            return Ok(());
        }

        let mut updated = Vec::with_capacity(self.entries.len() + 1);
        updated.push(seconds);
        updated.extend_from_slice(&self.entries);

        self.store.set(HISTORY_KEY, Value::from(updated.clone()))?;
        self.entries = updated;
        Ok(())
    }

    /// All results, most recent first.
    pub fn entries(&self) -> &[f64] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode_entries(value: Value) -> Vec<f64> {
    let Value::Array(items) = value else {
        log::warn!("history: stored value is not a list; ignoring it");
        return Vec::new();
    };

    let total = items.len();
    let entries: Vec<f64> = items
        .iter()
        .filter_map(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();

    if entries.len() < total {
        log::warn!(
            "history: dropped {} malformed entries",
            total - entries.len()
        );
    }
    entries
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
