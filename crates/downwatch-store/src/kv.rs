//! Byte-level key-value interface behind the typed stores.

use crate::error::StoreError;

/// Flat keyspace of named byte blobs.
///
/// Keys are plain filenames: no path separators, no traversal, non-empty.
/// Implementations must make `put_new` create-exclusive so that written
/// entries are never silently overwritten.
pub trait KvStore: Send + Sync {
    /// Writes `bytes` under `key`, replacing any existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] or [`StoreError::Io`].
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Writes `bytes` under `key` only if the key does not already exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the key is taken,
    /// [`StoreError::InvalidKey`] or [`StoreError::Io`] otherwise.
    fn put_new(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Reads the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent.
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// True when `key` holds a blob.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] or [`StoreError::Io`].
    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Removes the blob under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys starting with `prefix`, lexicographically sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on enumeration failure.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Rejects keys that could escape the flat namespace or collide with
/// directory entries the store does not own.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let reason = if key.is_empty() {
        Some("key must be non-empty")
    } else if key.contains('/') || key.contains('\\') {
        Some("key must not contain path separators")
    } else if key == "." || key == ".." {
        Some("key must not be a directory reference")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidKey {
            key: key.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Ok(()),
    }
}
