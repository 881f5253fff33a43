//! In-memory store for tests and ephemeral runs.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::StoreError;
use crate::kv::{validate_key, KvStore};

/// `BTreeMap` behind an `RwLock`; keys come back sorted for free.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut entries = self.entries.write().expect("store lock poisoned");
        entries.insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn put_new(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut entries = self.entries.write().expect("store lock poisoned");
        if entries.contains_key(key) {
            return Err(StoreError::AlreadyExists {
                key: key.to_owned(),
            });
        }
        entries.insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        validate_key(key)?;
        let entries = self.entries.read().expect("store lock poisoned");
        entries.get(key).cloned().ok_or_else(|| StoreError::NotFound {
            key: key.to_owned(),
        })
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        let entries = self.entries.read().expect("store lock poisoned");
        Ok(entries.contains_key(key))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut entries = self.entries.write().expect("store lock poisoned");
        entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_owned(),
            })
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().expect("store lock poisoned");
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
