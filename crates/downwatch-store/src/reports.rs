//! Typed report persistence keyed by caller-supplied filename.
//!
//! Unlike snapshots, report filenames are chosen by the caller (the
//! `{slug}.json` convention for per-provider insight reports); the store
//! enforces key validity and uniqueness of the keyspace, nothing more.
//! Saving under an existing filename replaces the report — regeneration for
//! a provider supersedes its previous report by design.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::kv::KvStore;

#[derive(Clone)]
pub struct ReportStore {
    kv: Arc<dyn KvStore>,
}

impl ReportStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Persists `report` under `filename`, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`], [`StoreError::InvalidKey`], or
    /// [`StoreError::Io`].
    pub fn save<T: Serialize>(&self, filename: &str, report: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(report).map_err(|e| StoreError::Serialize {
            key: filename.to_owned(),
            source: e,
        })?;
        self.kv.put(filename, &bytes)?;
        tracing::info!(filename, "saved report");
        Ok(())
    }

    /// Loads the report stored under `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if absent or
    /// [`StoreError::Deserialize`] if the stored bytes do not parse as `T`.
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T, StoreError> {
        let bytes = self.kv.get(filename)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialize {
            key: filename.to_owned(),
            source: e,
        })
    }

    /// True when a report exists under `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] or [`StoreError::Io`].
    pub fn exists(&self, filename: &str) -> Result<bool, StoreError> {
        self.kv.exists(filename)
    }

    /// Removes the report under `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent.
    pub fn delete(&self, filename: &str) -> Result<(), StoreError> {
        self.kv.delete(filename)?;
        tracing::info!(filename, "deleted report");
        Ok(())
    }
}
