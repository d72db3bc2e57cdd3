//! In-memory session store.
//!
//! `MemoryStore` keeps blobs in a map for the lifetime of the process. It is
//! used by tests and by ephemeral runs that should leave no trace on disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use checkin::{MemoryStore, Mode, Questionnaire};
//!
//! let store = MemoryStore::new().with_entry("phase_0:mode", "\"full\"");
//! let mut questionnaire = Questionnaire::new(phase, store);
//! assert_eq!(questionnaire.resume()?, Mode::Full);
//! ```

use std::collections::HashMap;

use crate::{SessionStore, StoreError};

/// A session store that lives in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    read_only: bool,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            read_only: false,
        }
    }

    /// Pre-populate a blob under `key`.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Reject every write, as a browser does with storage disabled or over quota.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Get the number of stored blobs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::Unavailable("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let mut store = MemoryStore::new();
        store.set("p:mode", "\"lite\"").unwrap();
        assert_eq!(store.get("p:mode").unwrap().as_deref(), Some("\"lite\""));

        store.remove("p:mode").unwrap();
        assert!(store.get("p:mode").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn read_only_rejects_writes() {
        let mut store = MemoryStore::new().with_entry("p:mode", "\"full\"").read_only();
        let err = store.set("p:mode", "\"lite\"").unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(store.get("p:mode").unwrap().as_deref(), Some("\"full\""));
    }

    #[test]
    fn keys_are_sorted() {
        let store = MemoryStore::new().with_entry("b", "1").with_entry("a", "2");
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }
}
