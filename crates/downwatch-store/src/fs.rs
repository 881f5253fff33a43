//! Filesystem-backed store: one file per key inside a single directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::kv::{validate_key, KvStore};

/// Flat directory of files, one per key.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Opens (creating if needed) the directory backing this store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::Io {
            key: root.display().to_string(),
            source: e,
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl KvStore for FsStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        fs::write(self.path_for(key), bytes).map_err(|e| StoreError::Io {
            key: key.to_owned(),
            source: e,
        })
    }

    fn put_new(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(key))
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StoreError::AlreadyExists {
                        key: key.to_owned(),
                    }
                } else {
                    StoreError::Io {
                        key: key.to_owned(),
                        source: e,
                    }
                }
            })?;
        file.write_all(bytes).map_err(|e| StoreError::Io {
            key: key.to_owned(),
            source: e,
        })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        validate_key(key)?;
        fs::read(self.path_for(key)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    key: key.to_owned(),
                }
            } else {
                StoreError::Io {
                    key: key.to_owned(),
                    source: e,
                }
            }
        })
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self.path_for(key).is_file())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        fs::remove_file(self.path_for(key)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    key: key.to_owned(),
                }
            } else {
                StoreError::Io {
                    key: key.to_owned(),
                    source: e,
                }
            }
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::Io {
            key: self.root.display().to_string(),
            source: e,
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io {
                key: self.root.display().to_string(),
                source: e,
            })?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(prefix) {
                    keys.push(name.to_owned());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
