//! Origin-scoped key-value storage.
//!
//! The console persists exactly one session record. In a browser this is
//! `localStorage`; elsewhere it is an in-memory map or a directory of
//! files. Writes are last-write-wins and need no locking beyond what each
//! implementation does internally.

use harbor_core::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StorageError;

/// String key-value storage shared by the opener and its popups.
///
/// Implementations are interior-mutable so that one handle can be shared
/// between the session store and the OAuth2 relay.
pub trait KeyValueStore: Send + Sync {
    /// Reads a key. Missing or unreadable keys read as `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a key, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a key. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the removal.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Storage backed by one file per key in a directory.
///
/// Keys are used as file names and must not contain path separators.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        };
        std::fs::create_dir_all(&self.dir).map_err(write_failed)?;
        std::fs::write(self.path_for(key), value).map_err(write_failed)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("k"), None);
        store.set("k", "v1").expect("set");
        assert_eq!(store.get("k").as_deref(), Some("v1"));
        store.set("k", "v2").expect("overwrite");
        assert_eq!(store.get("k").as_deref(), Some("v2"));
        store.remove("k").expect("remove");
        assert_eq!(store.get("k"), None);
        store.remove("k").expect("removing a missing key succeeds");
    }

    #[test]
    fn memory_store_semantics() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_semantics() {
        let dir = tempfile::tempdir().expect("tempdir");
        exercise(&FileStore::new(dir.path().join("storage")));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        FileStore::new(dir.path())
            .set("harbor-auth", "{}")
            .expect("set");
        assert_eq!(
            FileStore::new(dir.path()).get("harbor-auth").as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn arc_handles_share_entries() {
        let store = Arc::new(MemoryStore::new());
        let other = Arc::clone(&store);
        store.set("shared", "yes").expect("set");
        assert_eq!(other.get("shared").as_deref(), Some("yes"));
    }
}
