//! Fetching and extraction for outage-aggregator pages.
//!
//! [`PageClient`] retrieves the raw HTML of a provider's problems page and
//! outage map; [`parse`] turns that HTML into an ordered [`OutageRecord`]
//! sequence. Fetching and extraction fail independently: an error page is
//! never mistaken for a provider with no reported issues.

pub mod client;
pub mod error;
pub mod parse;
pub mod types;

mod parse_helpers;
mod retry;

pub use client::PageClient;
pub use error::ScrapeError;
pub use parse::extract_snapshot;
pub use types::{OutageRecord, RecordSource, Snapshot, StarRating};
