//! Persistence for snapshots and insight reports.
//!
//! Two flat keyspaces of named, immutable-once-written JSON files sit on a
//! pluggable byte-level [`KvStore`]: [`FsStore`] for production parity with
//! the on-disk layout (`snapshots/` and `reports/` directories) and
//! [`MemStore`] so pipeline logic can be tested without touching the
//! filesystem. [`SnapshotStore`] and [`ReportStore`] add the typed JSON and
//! naming conventions on top.

pub mod error;
pub mod fs;
pub mod kv;
pub mod memory;
pub mod reports;
pub mod snapshots;

pub use error::StoreError;
pub use fs::FsStore;
pub use kv::KvStore;
pub use memory::MemStore;
pub use reports::ReportStore;
pub use snapshots::SnapshotStore;
