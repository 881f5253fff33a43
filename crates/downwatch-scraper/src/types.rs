//! Normalized outage data extracted from aggregator pages.
//!
//! ## Observed page structure (istheservicedown.com)
//!
//! A provider's problems page carries five report-bearing sections:
//! - `#latestreports tr` — three-cell rows: city, reason, `<time datetime>`.
//! - `ul.reports > li` — free-text complaints with a pseudolink username,
//!   `<time datetime>`, and an optional `a.city-link` location.
//! - `ol.doughtnut-list > li` — problem-category shares; the percentage sits
//!   either in a `p span` or the `alt` text of the doughnut image.
//! - `#twitter-timeline-section a` — the provider's own status posts, each
//!   with an account name, body text, and `<time datetime>`.
//! - `.star-rating-text` — current rating plus review count.
//!
//! The companion `/map` page has `table#status-table` with two-cell rows:
//! location link and a comma-grouped report count.
//!
//! Each section row normalizes to one [`OutageRecord`]; rows that do not
//! match the expected cell shape are skipped during extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which page section an [`OutageRecord`] was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Row of the latest-reports table (one sighting per row).
    LatestReport,
    /// Free-text complaint from the issue feed.
    IssueFeed,
    /// Aggregated report total for one location from the outage map.
    LocationTotal,
    /// Share of total reports attributed to one problem category.
    ProblemShare,
    /// Official status post from the provider's embedded timeline.
    CompanyPost,
}

/// One normalized outage report.
///
/// Immutable after creation; collected in scrape order. Which optional
/// fields are populated depends on [`RecordSource`]:
/// `LatestReport` carries location/category/bucket, `IssueFeed` carries
/// complaint text, `LocationTotal` carries a multi-report count,
/// `ProblemShare` carries a category with its percentage in `reports`, and
/// `CompanyPost` carries the post body in `complaint` with the posting
/// account in `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutageRecord {
    pub source: RecordSource,
    /// Report count for `LocationTotal`, percentage for `ProblemShare`,
    /// `1` for single-sighting rows.
    pub reports: u32,
    pub bucket: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub complaint: Option<String>,
}

/// Star rating widget contents: current value and review count, both kept
/// as displayed (the count is a formatted string like `"12,345"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarRating {
    pub current: f64,
    pub count: Option<String>,
}

/// Immutable capture of one provider's outage reports at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub service: String,
    pub fetched_at: DateTime<Utc>,
    pub star_rating: Option<StarRating>,
    pub records: Vec<OutageRecord>,
}

impl Snapshot {
    /// Total report volume across location-total records.
    #[must_use]
    pub fn total_location_reports(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| r.source == RecordSource::LocationTotal)
            .map(|r| u64::from(r.reports))
            .sum()
    }

    /// Number of distinct locations reported on the outage map.
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.source == RecordSource::LocationTotal)
            .count()
    }

    /// Percentage share for a problem category, matched case-insensitively.
    #[must_use]
    pub fn problem_share(&self, category: &str) -> Option<u32> {
        self.records
            .iter()
            .filter(|r| r.source == RecordSource::ProblemShare)
            .find(|r| {
                r.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category))
            })
            .map(|r| r.reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn location_total(location: &str, reports: u32) -> OutageRecord {
        OutageRecord {
            source: RecordSource::LocationTotal,
            reports,
            bucket: None,
            location: Some(location.to_string()),
            category: None,
            complaint: None,
        }
    }

    fn problem_share(category: &str, percent: u32) -> OutageRecord {
        OutageRecord {
            source: RecordSource::ProblemShare,
            reports: percent,
            bucket: None,
            location: None,
            category: Some(category.to_string()),
            complaint: None,
        }
    }

    fn snapshot(records: Vec<OutageRecord>) -> Snapshot {
        Snapshot {
            service: "t-mobile".to_string(),
            fetched_at: Utc::now(),
            star_rating: None,
            records,
        }
    }

    #[test]
    fn total_location_reports_sums_only_location_totals() {
        let snap = snapshot(vec![
            location_total("Austin, TX", 120),
            location_total("Dallas, TX", 80),
            problem_share("Internet", 55),
        ]);
        assert_eq!(snap.total_location_reports(), 200);
        assert_eq!(snap.location_count(), 2);
    }

    #[test]
    fn problem_share_is_case_insensitive() {
        let snap = snapshot(vec![problem_share("Total Blackout", 17)]);
        assert_eq!(snap.problem_share("total blackout"), Some(17));
        assert_eq!(snap.problem_share("TV"), None);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snap = snapshot(vec![OutageRecord {
            source: RecordSource::IssueFeed,
            reports: 1,
            bucket: Some(Utc::now()),
            location: Some("Seattle, WA".to_string()),
            category: None,
            complaint: Some("No signal since this morning".to_string()),
        }]);
        let json = serde_json::to_string(&snap).expect("serialize");
        let back: Snapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, snap);
    }

    #[test]
    fn empty_snapshot_round_trips() {
        let snap = snapshot(vec![]);
        let json = serde_json::to_string(&snap).expect("serialize");
        let back: Snapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.records.len(), 0);
        assert_eq!(back, snap);
    }
}
