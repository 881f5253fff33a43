//! HTML extraction for the problems page and outage map.
//!
//! Extraction is lenient: malformed rows and missing sections are skipped
//! with a log line, never fatal. A page with zero matching widgets yields a
//! valid empty record sequence — the provider simply has nothing reported —
//! which is distinct from a fetch failure (the caller never reaches this
//! code with error HTML).

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};

use crate::parse_helpers::{
    parse_datetime, parse_percent, parse_report_count, strip_percent_annotation, text_content,
};
use crate::types::{OutageRecord, RecordSource, Snapshot, StarRating};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector literal")
}

/// Parses the star-rating widget, if present.
pub fn parse_star_rating(doc: &Html) -> Option<StarRating> {
    let container = doc.select(&selector(".star-rating-text")).next()?;
    let current = container
        .select(&selector(".star-rating-current"))
        .next()
        .map(text_content)?;
    let count = container
        .select(&selector(".star-rating-count"))
        .next()
        .map(text_content)
        .filter(|s| !s.is_empty());

    let current: f64 = current.parse().ok()?;
    Some(StarRating { current, count })
}

/// Parses the latest-reports table into one record per three-cell row.
pub fn parse_latest_reports(doc: &Html) -> Vec<OutageRecord> {
    let time_sel = selector("time");
    let mut records = Vec::new();

    for row in doc.select(&selector("#latestreports tr")) {
        let cells: Vec<_> = row.select(&selector("td")).collect();
        if cells.len() != 3 {
            tracing::debug!(cells = cells.len(), "skipping malformed latest-reports row");
            continue;
        }

        let city = text_content(cells[0]);
        let reason = text_content(cells[1]);
        let bucket = cells[2]
            .select(&time_sel)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(parse_datetime);

        records.push(OutageRecord {
            source: RecordSource::LatestReport,
            reports: 1,
            bucket,
            location: (!city.is_empty()).then_some(city),
            category: (!reason.is_empty()).then_some(reason),
            complaint: None,
        });
    }

    records
}

/// Parses the free-text issue feed into one record per entry.
pub fn parse_issue_feed(doc: &Html) -> Vec<OutageRecord> {
    let body_sel = selector("p span");
    let time_sel = selector("time");
    let loc_sel = selector("a.city-link");
    let mut records = Vec::new();

    for item in doc.select(&selector("ul.reports > li")) {
        let complaint = item
            .select(&body_sel)
            .next()
            .map(text_content)
            .filter(|s| !s.is_empty());
        if complaint.is_none() {
            tracing::debug!("skipping issue-feed entry without complaint text");
            continue;
        }

        let bucket = item
            .select(&time_sel)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(parse_datetime);
        let location = item
            .select(&loc_sel)
            .next()
            .map(text_content)
            .filter(|s| !s.is_empty());

        records.push(OutageRecord {
            source: RecordSource::IssueFeed,
            reports: 1,
            bucket,
            location,
            category: None,
            complaint,
        });
    }

    records
}

/// Parses the most-reported-problems doughnut list.
///
/// The percentage lives either in the label's inner `span` or in the `alt`
/// text of the chart segment image; rows with neither are skipped.
pub fn parse_problem_shares(doc: &Html) -> Vec<OutageRecord> {
    let label_sel = selector("p");
    let span_sel = selector("p span");
    let img_sel = selector("img");
    let mut records = Vec::new();

    for item in doc.select(&selector("ol.doughtnut-list > li")) {
        let label = item.select(&label_sel).next().map(text_content);
        let Some(label) = label.filter(|l| !l.is_empty()) else {
            tracing::debug!("skipping problem-share row without label");
            continue;
        };

        let percent = item
            .select(&span_sel)
            .next()
            .map(text_content)
            .and_then(|s| parse_percent(&s))
            .or_else(|| {
                item.select(&img_sel)
                    .next()
                    .and_then(|img| img.value().attr("alt"))
                    .and_then(parse_percent)
            });
        let Some(percent) = percent else {
            tracing::debug!(label, "skipping problem-share row without percentage");
            continue;
        };

        records.push(OutageRecord {
            source: RecordSource::ProblemShare,
            reports: percent,
            bucket: None,
            location: None,
            category: Some(strip_percent_annotation(&label)),
            complaint: None,
        });
    }

    records
}

/// Parses the provider's embedded official-posts timeline.
///
/// Each anchor is one post; the body lives in `.twitter-timeline-text` and
/// posts without one (profile links, media-only entries) are skipped.
pub fn parse_company_posts(doc: &Html) -> Vec<OutageRecord> {
    let name_sel = selector(".twitter-timeline-name");
    let text_sel = selector(".twitter-timeline-text");
    let time_sel = selector(".twitter-timeline-time time");
    let mut records = Vec::new();

    for post in doc.select(&selector("#twitter-timeline-section a")) {
        let complaint = post
            .select(&text_sel)
            .next()
            .map(text_content)
            .filter(|s| !s.is_empty());
        if complaint.is_none() {
            tracing::debug!("skipping company post without body text");
            continue;
        }

        let category = post
            .select(&name_sel)
            .next()
            .map(text_content)
            .filter(|s| !s.is_empty());
        let bucket = post
            .select(&time_sel)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(parse_datetime);

        records.push(OutageRecord {
            source: RecordSource::CompanyPost,
            reports: 1,
            bucket,
            location: None,
            category,
            complaint,
        });
    }

    records
}

/// Parses the outage map's most-affected-locations table.
pub fn parse_location_totals(doc: &Html) -> Vec<OutageRecord> {
    let link_sel = selector("a");
    let mut records = Vec::new();

    for row in doc.select(&selector("table#status-table tr")) {
        let cells: Vec<_> = row.select(&selector("td")).collect();
        if cells.len() != 2 {
            // Header rows use th cells and fall through here.
            continue;
        }

        let location = cells[0]
            .select(&link_sel)
            .next()
            .map(text_content)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| text_content(cells[0]));
        let Some(reports) = parse_report_count(&text_content(cells[1])) else {
            tracing::debug!(location, "skipping location row without report count");
            continue;
        };

        records.push(OutageRecord {
            source: RecordSource::LocationTotal,
            reports,
            bucket: None,
            location: (!location.is_empty()).then_some(location),
            category: None,
            complaint: None,
        });
    }

    records
}

/// Parses a full problems page into its star rating and record sequence.
#[must_use]
pub fn parse_problems_page(html: &str) -> (Option<StarRating>, Vec<OutageRecord>) {
    let doc = Html::parse_document(html);

    let star_rating = parse_star_rating(&doc);
    if star_rating.is_none() {
        tracing::debug!("problems page has no star-rating widget");
    }

    let mut records = parse_latest_reports(&doc);
    records.extend(parse_issue_feed(&doc));
    records.extend(parse_problem_shares(&doc));
    records.extend(parse_company_posts(&doc));

    (star_rating, records)
}

/// Parses the outage map page into location-total records.
#[must_use]
pub fn parse_map_page(html: &str) -> Vec<OutageRecord> {
    let doc = Html::parse_document(html);
    parse_location_totals(&doc)
}

/// Builds an immutable [`Snapshot`] from both pages of one fetch run.
///
/// Record order is scrape order: latest reports, issue feed, problem
/// shares, company posts, then map location totals.
#[must_use]
pub fn extract_snapshot(
    slug: &str,
    fetched_at: DateTime<Utc>,
    problems_html: &str,
    map_html: &str,
) -> Snapshot {
    let (star_rating, mut records) = parse_problems_page(problems_html);
    records.extend(parse_map_page(map_html));

    tracing::info!(
        service = slug,
        records = records.len(),
        has_rating = star_rating.is_some(),
        "extracted snapshot"
    );

    Snapshot {
        service: slug.to_owned(),
        fetched_at,
        star_rating,
        records,
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
