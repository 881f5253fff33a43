//! Deterministic cross-provider comparison against the baseline carrier.
//!
//! Works entirely from stored snapshots and reports; providers that were
//! never scraped are flagged rather than skipped, so the output always
//! covers the full configured roster.

use chrono::{DateTime, Utc};
use downwatch_core::services::{ServiceConfig, ServicesFile};
use downwatch_scraper::Snapshot;
use downwatch_store::{ReportStore, SnapshotStore, StoreError};
use serde::{Deserialize, Serialize};

use crate::report::InsightReport;

/// Metrics extracted from one provider's latest snapshot and report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetrics {
    pub star_rating: Option<f64>,
    pub total_reports: u64,
    pub locations: usize,
    pub blackout_pct: Option<u32>,
    pub internet_pct: Option<u32>,
    pub phone_pct: Option<u32>,
    pub pain_index: Option<f64>,
}

/// One provider's entry in a comparison, with metric names it beats or
/// trails the baseline on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderComparison {
    pub name: String,
    pub slug: String,
    pub is_baseline: bool,
    pub has_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ProviderMetrics>,
    #[serde(default)]
    pub better_than_baseline: Vec<String>,
    #[serde(default)]
    pub worse_than_baseline: Vec<String>,
}

/// Full comparison output: every configured provider, ranked worst-first
/// by pain index, providers without data last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline: String,
    pub generated_at: DateTime<Utc>,
    pub providers: Vec<ProviderComparison>,
}

fn snapshot_metrics(snapshot: &Snapshot, pain_index: Option<f64>) -> ProviderMetrics {
    ProviderMetrics {
        star_rating: snapshot.star_rating.as_ref().map(|r| r.current),
        total_reports: snapshot.total_location_reports(),
        locations: snapshot.location_count(),
        blackout_pct: snapshot.problem_share("Total Blackout"),
        internet_pct: snapshot.problem_share("Internet"),
        phone_pct: snapshot.problem_share("Phone"),
        pain_index,
    }
}

fn load_provider(
    service: &ServiceConfig,
    snapshots: &SnapshotStore,
    reports: &ReportStore,
) -> Result<ProviderComparison, StoreError> {
    let slug = service.slug();

    let snapshot_id = snapshots.latest(&slug)?;
    let snapshot = match &snapshot_id {
        Some(id) => Some(snapshots.load(id)?),
        None => None,
    };

    let pain_index = match reports.load::<InsightReport>(&service.report_filename()) {
        Ok(report) => Some(report.payload.pain_index),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    let metrics = snapshot.as_ref().map(|s| snapshot_metrics(s, pain_index));
    Ok(ProviderComparison {
        name: service.name.clone(),
        slug,
        is_baseline: service.baseline,
        has_data: metrics.is_some(),
        snapshot_id,
        metrics,
        better_than_baseline: Vec::new(),
        worse_than_baseline: Vec::new(),
    })
}

// Fills better/worse lists on `provider` by comparing against `baseline`.
// A metric only participates when both sides have a value; ties land in
// neither list.
fn score_against_baseline(provider: &mut ProviderComparison, baseline: &ProviderMetrics) {
    let Some(metrics) = provider.metrics.clone() else {
        return;
    };

    // (metric name, provider value, baseline value, lower-is-better)
    let pairs: [(&str, Option<f64>, Option<f64>, bool); 6] = [
        ("star_rating", metrics.star_rating, baseline.star_rating, false),
        (
            "total_reports",
            Some(to_f64(metrics.total_reports)),
            Some(to_f64(baseline.total_reports)),
            true,
        ),
        (
            "blackout_pct",
            metrics.blackout_pct.map(f64::from),
            baseline.blackout_pct.map(f64::from),
            true,
        ),
        (
            "internet_pct",
            metrics.internet_pct.map(f64::from),
            baseline.internet_pct.map(f64::from),
            true,
        ),
        (
            "phone_pct",
            metrics.phone_pct.map(f64::from),
            baseline.phone_pct.map(f64::from),
            true,
        ),
        ("pain_index", metrics.pain_index, baseline.pain_index, true),
    ];

    for (name, ours, theirs, lower_is_better) in pairs {
        let (Some(ours), Some(theirs)) = (ours, theirs) else {
            continue;
        };
        if (ours - theirs).abs() < f64::EPSILON {
            continue;
        }
        let better = if lower_is_better {
            ours < theirs
        } else {
            ours > theirs
        };
        if better {
            provider.better_than_baseline.push(name.to_owned());
        } else {
            provider.worse_than_baseline.push(name.to_owned());
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: u64) -> f64 {
    value as f64
}

/// Builds the comparison across every configured provider.
///
/// Ranking is worst-first: providers with data sort by pain index
/// descending (those without a pain index after those with one), and
/// providers with no stored snapshot trail the list.
///
/// # Errors
///
/// Returns [`StoreError`] on any storage failure other than a missing
/// snapshot or report, which are expected and flagged via `has_data`.
pub fn compare_services(
    services: &ServicesFile,
    snapshots: &SnapshotStore,
    reports: &ReportStore,
) -> Result<ComparisonResult, StoreError> {
    let baseline_service = services.baseline();
    let baseline_name = baseline_service.map_or_else(String::new, |s| s.name.clone());

    let mut providers = Vec::with_capacity(services.services.len());
    for service in &services.services {
        providers.push(load_provider(service, snapshots, reports)?);
    }

    if let Some(baseline) = baseline_service {
        let baseline_slug = baseline.slug();
        let baseline_metrics = providers
            .iter()
            .find(|p| p.slug == baseline_slug)
            .and_then(|p| p.metrics.clone());
        if let Some(baseline_metrics) = baseline_metrics {
            for provider in &mut providers {
                if provider.slug != baseline_slug {
                    score_against_baseline(provider, &baseline_metrics);
                }
            }
        }
    }

    providers.sort_by(|a, b| {
        b.has_data
            .cmp(&a.has_data)
            .then_with(|| {
                let pain = |p: &ProviderComparison| {
                    p.metrics.as_ref().and_then(|m| m.pain_index)
                };
                match (pain(a), pain(b)) {
                    (Some(x), Some(y)) => {
                        y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal)
                    }
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            })
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(ComparisonResult {
        baseline: baseline_name,
        generated_at: Utc::now(),
        providers,
    })
}

#[cfg(test)]
#[path = "compare_test.rs"]
mod tests;
