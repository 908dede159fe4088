use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A flat string key/value store, the shape of the browser's Web Storage.
///
/// Batch operations are atomic: either every entry is applied or none is.
pub trait Storage: Send + Sync {
    /// A descriptive name for the backend (for logs/debug).
    fn name(&self) -> &str;

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_items(&self, entries: &[(&str, String)]) -> Result<(), StorageError>;

    /// Removing absent keys is not an error.
    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError>;

    /// All keys currently present, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.set_items(&[(key, value)])
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.remove_items(&[key])
    }

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.keys()?.is_empty())
    }
}

/// Process-memory storage. Contents live exactly as long as the value.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_items(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            items.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            items.remove(*key);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.keys().cloned().collect())
    }
}
