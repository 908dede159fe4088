use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::session::{Storage, StorageError};

/// A record that can live in a [`Collection`].
pub trait Record: Serialize + DeserializeOwned + Clone {
    fn id(&self) -> Uuid;

    /// Text matched by [`Collection::search`].
    fn search_text(&self) -> String;
}

/// A list of records persisted as one JSON array under a storage key.
///
/// Every mutation writes the whole array back before it becomes visible, so
/// storage always mirrors what `list` returns.
pub struct Collection<T> {
    storage: Arc<dyn Storage>,
    key: String,
    items: Vec<T>,
}

impl<T: Record> Collection<T> {
    /// Loads the array stored under `key`; a missing key is an empty collection.
    pub fn load(storage: Arc<dyn Storage>, key: impl Into<String>) -> Result<Self, StorageError> {
        let key = key.into();
        let items = match storage.get_item(&key)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        Ok(Collection {
            storage,
            key,
            items,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn list(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn add(&mut self, item: T) -> Result<(), StorageError> {
        let mut next = self.items.clone();
        next.push(item);
        self.commit(next)
    }

    /// Removes the record with `id`, returning it. Unknown ids are a no-op.
    pub fn remove(&mut self, id: Uuid) -> Result<Option<T>, StorageError> {
        let Some(index) = self.items.iter().position(|item| item.id() == id) else {
            return Ok(None);
        };
        let mut next = self.items.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(Some(removed))
    }

    /// Case-insensitive substring match over each record's search text.
    /// A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<&T> {
        let needle = query.trim().to_lowercase();
        self.items
            .iter()
            .filter(|item| needle.is_empty() || item.search_text().to_lowercase().contains(&needle))
            .collect()
    }

    fn commit(&mut self, next: Vec<T>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&next)?;
        self.storage.set_item(&self.key, raw)?;
        debug!(key = %self.key, len = next.len(), "Collection persisted");
        self.items = next;
        Ok(())
    }
}
