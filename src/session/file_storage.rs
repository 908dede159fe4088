use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use super::storage::{Storage, StorageError};

/// Storage persisted as a single JSON object on disk.
///
/// Every mutation rewrites the whole file through a temp file + rename, so a
/// crash leaves either the old or the new contents. The in-memory copy is only
/// updated after the write succeeded.
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens (or lazily creates) the storage file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let items = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };

        info!(
            "Opened durable session storage at '{}' ({} keys)",
            path.display(),
            items.len()
        );

        Ok(FileStorage {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!("Persisted {} keys to '{}'", items.len(), self.path.display());
        Ok(())
    }

    /// Applies `change` to a copy, persists it, then commits it to memory.
    fn update<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = items.clone();
        change(&mut next);
        if next == *items {
            return Ok(());
        }
        self.persist(&next)?;
        *items = next;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_items(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        self.update(|items| {
            for (key, value) in entries {
                items.insert((*key).to_string(), value.clone());
            }
        })
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.update(|items| {
            for key in keys {
                items.remove(*key);
            }
        })
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.keys().cloned().collect())
    }
}
