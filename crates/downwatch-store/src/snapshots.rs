//! Typed snapshot persistence with time-derived, immutable ids.
//!
//! Snapshot ids follow `{slug}-{YYYYMMDDTHHMMSSZ}.json`, derived from the
//! snapshot's `fetched_at`. The compact UTC format makes lexicographic key
//! order chronological, so `latest` is just the greatest key under the slug
//! prefix. Two writers landing in the same second are separated by a `-2`,
//! `-3`… suffix probe over `put_new`, so an existing snapshot is never
//! overwritten. Among same-second siblings the suffixed ids sort before the
//! unsuffixed one (`-` < `.`), so `latest` resolves the first writer's
//! snapshot; the siblings share a capture second, so either is equally
//! fresh.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use downwatch_scraper::Snapshot;

use crate::error::StoreError;
use crate::kv::KvStore;

const ID_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// How many same-second suffix probes to attempt before giving up.
const MAX_ID_PROBES: u32 = 100;

#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KvStore>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Persists a new immutable snapshot and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if the snapshot cannot be encoded,
    /// [`StoreError::AlreadyExists`] if the probe limit is exhausted, or
    /// [`StoreError::Io`] from the backing store.
    pub fn save(&self, snapshot: &Snapshot) -> Result<String, StoreError> {
        let base = format!(
            "{}-{}",
            snapshot.service,
            snapshot.fetched_at.format(ID_TIME_FORMAT)
        );
        let bytes =
            serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialize {
                key: format!("{base}.json"),
                source: e,
            })?;

        let mut candidate = format!("{base}.json");
        for probe in 2..=MAX_ID_PROBES {
            match self.kv.put_new(&candidate, &bytes) {
                Ok(()) => {
                    tracing::info!(snapshot_id = %candidate, service = %snapshot.service, "saved snapshot");
                    return Ok(candidate);
                }
                Err(StoreError::AlreadyExists { .. }) => {
                    candidate = format!("{base}-{probe}.json");
                }
                Err(other) => return Err(other),
            }
        }
        Err(StoreError::AlreadyExists { key: candidate })
    }

    /// Loads a snapshot by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if absent or
    /// [`StoreError::Deserialize`] if the stored bytes do not parse.
    pub fn load(&self, snapshot_id: &str) -> Result<Snapshot, StoreError> {
        let bytes = self.kv.get(snapshot_id)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialize {
            key: snapshot_id.to_owned(),
            source: e,
        })
    }

    /// True when at least one snapshot exists for the service.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] from the backing store.
    pub fn exists(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.latest(slug)?.is_some())
    }

    /// Id of the most recent snapshot for the service, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] from the backing store.
    pub fn latest(&self, slug: &str) -> Result<Option<String>, StoreError> {
        let prefix = format!("{slug}-");
        let keys = self.kv.list(&prefix)?;
        // The slug prefix alone would also match a longer sibling slug
        // ("verizon-" matches "verizon-wireless-…"), so require the id
        // timestamp to start right after the dash.
        Ok(keys
            .into_iter()
            .filter(|k| {
                k[prefix.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
            })
            .next_back())
    }

    /// Id of the most recent snapshot iff it is younger than `max_age`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] from the backing store.
    pub fn fresh(&self, slug: &str, max_age: Duration) -> Result<Option<String>, StoreError> {
        let Some(id) = self.latest(slug)? else {
            return Ok(None);
        };
        let Some(taken_at) = id_timestamp(&id, slug) else {
            tracing::warn!(snapshot_id = %id, "snapshot id has no parseable timestamp; treating as stale");
            return Ok(None);
        };
        if Utc::now() - taken_at <= max_age {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }
}

/// Extracts the capture time embedded in a snapshot id.
fn id_timestamp(snapshot_id: &str, slug: &str) -> Option<DateTime<Utc>> {
    let rest = snapshot_id
        .strip_prefix(slug)?
        .strip_prefix('-')?
        .strip_suffix(".json")?;
    // Drop any collision suffix: "20251105T215200Z-2" → "20251105T215200Z".
    let stamp = rest.split('-').next()?;
    NaiveDateTime::parse_from_str(stamp, ID_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemStore;
    use downwatch_scraper::{OutageRecord, RecordSource};

    fn store() -> SnapshotStore {
        SnapshotStore::new(Arc::new(MemStore::new()))
    }

    fn snapshot(slug: &str, fetched_at: &str, records: Vec<OutageRecord>) -> Snapshot {
        Snapshot {
            service: slug.to_owned(),
            fetched_at: fetched_at.parse().expect("valid timestamp"),
            star_rating: None,
            records,
        }
    }

    fn one_record() -> OutageRecord {
        OutageRecord {
            source: RecordSource::LocationTotal,
            reports: 42,
            bucket: None,
            location: Some("Austin, TX".to_owned()),
            category: None,
            complaint: None,
        }
    }

    #[test]
    fn save_derives_time_based_id() {
        let store = store();
        let id = store
            .save(&snapshot("t-mobile", "2025-11-05T21:52:00Z", vec![one_record()]))
            .expect("save");
        assert_eq!(id, "t-mobile-20251105T215200Z.json");
    }

    #[test]
    fn save_load_round_trips_structurally() {
        let store = store();
        let snap = snapshot("t-mobile", "2025-11-05T21:52:00Z", vec![one_record()]);
        let id = store.save(&snap).expect("save");
        assert_eq!(store.load(&id).expect("load"), snap);
    }

    #[test]
    fn empty_records_round_trip() {
        let store = store();
        let snap = snapshot("verizon", "2025-11-05T21:52:00Z", vec![]);
        let id = store.save(&snap).expect("save");
        let loaded = store.load(&id).expect("load");
        assert!(loaded.records.is_empty());
        assert_eq!(loaded, snap);
    }

    #[test]
    fn same_second_saves_get_distinct_ids() {
        let store = store();
        let snap = snapshot("t-mobile", "2025-11-05T21:52:00Z", vec![one_record()]);
        let first = store.save(&snap).expect("first save");
        let second = store.save(&snap).expect("second save");
        assert_ne!(first, second);
        assert_eq!(second, "t-mobile-20251105T215200Z-2.json");
        // First snapshot is intact.
        assert_eq!(store.load(&first).expect("load first"), snap);
    }

    #[test]
    fn latest_prefers_unsuffixed_id_among_same_second_siblings() {
        let store = store();
        let snap = snapshot("t-mobile", "2025-11-05T21:52:00Z", vec![]);
        let first = store.save(&snap).expect("first save");
        store.save(&snap).expect("second save");
        // "-2" sorts before ".json", so the base id stays the latest.
        assert_eq!(store.latest("t-mobile").expect("latest"), Some(first));
    }

    #[test]
    fn load_missing_id_is_not_found() {
        let store = store();
        let err = store.load("t-mobile-20250101T000000Z.json").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn latest_returns_greatest_timestamp() {
        let store = store();
        store
            .save(&snapshot("t-mobile", "2025-11-05T10:00:00Z", vec![]))
            .expect("save older");
        store
            .save(&snapshot("t-mobile", "2025-11-05T12:00:00Z", vec![]))
            .expect("save newer");
        assert_eq!(
            store.latest("t-mobile").expect("latest"),
            Some("t-mobile-20251105T120000Z.json".to_owned())
        );
    }

    #[test]
    fn latest_does_not_cross_sibling_slugs() {
        let store = store();
        store
            .save(&snapshot("verizon-wireless", "2025-11-05T12:00:00Z", vec![]))
            .expect("save sibling");
        assert_eq!(store.latest("verizon").expect("latest"), None);
        assert!(!store.exists("verizon").expect("exists"));
    }

    #[test]
    fn fresh_respects_max_age() {
        let store = store();
        let old = snapshot("t-mobile", "2020-01-01T00:00:00Z", vec![]);
        store.save(&old).expect("save old");
        assert_eq!(
            store.fresh("t-mobile", Duration::minutes(15)).expect("fresh"),
            None
        );

        let now = Snapshot {
            fetched_at: Utc::now(),
            ..snapshot("t-mobile", "2020-01-01T00:00:00Z", vec![])
        };
        let id = store.save(&now).expect("save fresh");
        assert_eq!(
            store.fresh("t-mobile", Duration::minutes(15)).expect("fresh"),
            Some(id)
        );
    }

    #[test]
    fn id_timestamp_parses_with_and_without_probe_suffix() {
        let ts = id_timestamp("t-mobile-20251105T215200Z.json", "t-mobile").expect("parse");
        assert_eq!(ts.to_rfc3339(), "2025-11-05T21:52:00+00:00");
        assert_eq!(
            id_timestamp("t-mobile-20251105T215200Z-3.json", "t-mobile"),
            Some(ts)
        );
        assert_eq!(id_timestamp("t-mobile-garbage.json", "t-mobile"), None);
    }
}
