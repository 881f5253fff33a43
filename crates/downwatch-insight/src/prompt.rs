//! Prompt construction for the dashboard insight request.
//!
//! The snapshot is condensed into a plain-text digest (top locations,
//! problem shares, sampled complaints) rather than dumped as raw JSON, to
//! keep token usage bounded on large scrapes.

use std::fmt::Write as _;

use downwatch_scraper::{RecordSource, Snapshot};

const MAX_DIGEST_LOCATIONS: usize = 15;
const MAX_DIGEST_COMPLAINTS: usize = 20;
const MAX_DIGEST_POSTS: usize = 5;

/// Builds the user-role prompt asking the model for a dashboard JSON
/// payload describing `service_name` based on `snapshot`.
#[must_use]
pub fn dashboard_prompt(service_name: &str, snapshot: &Snapshot) -> String {
    format!(
        r#"You are a telecom outage analyst. Analyze the scraped outage data below for {service_name} and respond with a single JSON object, no prose and no markdown fences.

The JSON object must have exactly these fields:
- "provider": "{service_name}"
- "status": one of "good", "moderate", "major issues"
- "status_color": one of "green", "yellow", "red"
- "star_rating": number 0-5 with 2 decimals (use the rating in the data)
- "total_reports_24h": integer, total reports across all locations
- "pain_index": number 0-10 with 1 decimal; 0 means no customer pain, 10 means total blackout everywhere
- "sentiment": object with integer percentages "negative", "neutral", "positive" summing to 100, and "samples": up to 4 objects with "text" (a representative complaint from the data), "tone" ("negative"/"neutral"/"positive"), and optional "time_ago"
- "hotspots": up to 5 objects with "city", "reports_count" (integer), "severity" ("high"/"medium"/"low"), optional "top_issue"
- "active_outages": up to 10 objects with "city", "reason", "severity" ("high"/"medium"/"low"), optional "time_ago"
- "recent_activity": up to 8 objects with "city", "issue", optional "time"
- "problem_distribution": array of objects with "label" and integer "percent"
- "trend": one of "improving", "stable", "declining"
- "critical_insights": up to 4 short strings
- "recommendations": up to 3 short strings for affected customers
- "summary": one or two sentences

Base every number on the data. Do not invent locations or complaints that are not present.

SCRAPED DATA
{digest}"#,
        digest = digest(snapshot)
    )
}

/// Plain-text digest of a snapshot: rating, volume, problem shares, the
/// busiest locations, a sample of verbatim complaints, and any official
/// provider posts.
#[must_use]
pub fn digest(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "fetched_at: {}", snapshot.fetched_at.to_rfc3339());

    match &snapshot.star_rating {
        Some(rating) => {
            let _ = write!(out, "star_rating: {:.2}", rating.current);
            if let Some(count) = &rating.count {
                let _ = write!(out, " {count}");
            }
            out.push('\n');
        }
        None => out.push_str("star_rating: unavailable\n"),
    }

    let _ = writeln!(
        out,
        "total_reports: {} across {} locations",
        snapshot.total_location_reports(),
        snapshot.location_count()
    );

    let shares: Vec<String> = snapshot
        .records
        .iter()
        .filter(|r| r.source == RecordSource::ProblemShare)
        .filter_map(|r| r.category.as_deref().map(|c| format!("{c} {}%", r.reports)))
        .collect();
    if !shares.is_empty() {
        let _ = writeln!(out, "problem_shares: {}", shares.join(", "));
    }

    let mut locations: Vec<(&str, u32)> = snapshot
        .records
        .iter()
        .filter(|r| r.source == RecordSource::LocationTotal)
        .filter_map(|r| r.location.as_deref().map(|l| (l, r.reports)))
        .collect();
    locations.sort_by(|a, b| b.1.cmp(&a.1));
    if !locations.is_empty() {
        out.push_str("top_locations:\n");
        for (location, reports) in locations.iter().take(MAX_DIGEST_LOCATIONS) {
            let _ = writeln!(out, "  {location}: {reports} reports");
        }
    }

    let complaints: Vec<(Option<&str>, &str)> = snapshot
        .records
        .iter()
        .filter(|r| r.source == RecordSource::IssueFeed)
        .filter_map(|r| r.complaint.as_deref().map(|c| (r.location.as_deref(), c)))
        .collect();
    if !complaints.is_empty() {
        out.push_str("complaints:\n");
        for (location, complaint) in complaints.iter().take(MAX_DIGEST_COMPLAINTS) {
            match location {
                Some(location) => {
                    let _ = writeln!(out, "  [{location}] {complaint}");
                }
                None => {
                    let _ = writeln!(out, "  {complaint}");
                }
            }
        }
    }

    let posts: Vec<(Option<&str>, &str)> = snapshot
        .records
        .iter()
        .filter(|r| r.source == RecordSource::CompanyPost)
        .filter_map(|r| r.complaint.as_deref().map(|c| (r.category.as_deref(), c)))
        .collect();
    if !posts.is_empty() {
        out.push_str("official_provider_posts:\n");
        for (account, body) in posts.iter().take(MAX_DIGEST_POSTS) {
            match account {
                Some(account) => {
                    let _ = writeln!(out, "  [{account}] {body}");
                }
                None => {
                    let _ = writeln!(out, "  {body}");
                }
            }
        }
    }

    let recent = snapshot
        .records
        .iter()
        .filter(|r| r.source == RecordSource::LatestReport)
        .count();
    if recent > 0 {
        let _ = writeln!(out, "recent_report_rows: {recent}");
    }

    out
}
