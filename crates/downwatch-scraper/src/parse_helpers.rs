//! Low-level text and value extraction shared by the page parsers.
//!
//! All routines are lossy by design: a value that does not match any known
//! shape yields `None` and the caller decides whether to skip the row.

use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::ElementRef;

/// Collects the text content of an element, collapsing internal whitespace
/// runs to single spaces and trimming the ends.
pub(crate) fn text_content(el: ElementRef<'_>) -> String {
    let raw = el.text().collect::<Vec<_>>().join(" ");
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a timestamp from a page into UTC.
///
/// Tries ISO 8601 / RFC 3339 first (the `datetime` attribute format), then
/// the long human format used in `title` attributes:
/// `"Wednesday, November 5, 2025 9:52 PM"`. The human format carries no
/// zone; the aggregator renders it in UTC so it is interpreted as such.
pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(trimmed, "%A, %B %d, %Y %I:%M %p")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses a report count that may carry thousands separators: `"1,234"`.
pub(crate) fn parse_report_count(raw: &str) -> Option<u32> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Extracts the first percentage from text like `"Internet (55%)"` or `"55%"`.
///
/// Values above 100 are rejected; the doughnut chart never legitimately
/// reports more than the whole.
pub(crate) fn parse_percent(raw: &str) -> Option<u32> {
    let idx = raw.find('%')?;
    let digits: String = raw[..idx]
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let value: u32 = digits.parse().ok()?;
    (value <= 100).then_some(value)
}

/// Strips a trailing `"(NN%)"` annotation from a category label.
pub(crate) fn strip_percent_annotation(label: &str) -> String {
    let mut out = label.to_string();
    if let (Some(open), Some(close)) = (out.rfind('('), out.rfind(')')) {
        if open < close && out[open + 1..close].trim_end_matches('%').chars().all(|c| c.is_ascii_digit()) {
            out.replace_range(open..=close, "");
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parse_datetime_iso_with_offset() {
        let dt = parse_datetime("2025-11-05T21:52:00-06:00").expect("should parse");
        assert_eq!(dt.hour(), 3); // next day, UTC
    }

    #[test]
    fn parse_datetime_iso_zulu() {
        assert!(parse_datetime("2025-11-05T21:52:00Z").is_some());
    }

    #[test]
    fn parse_datetime_human_title_format() {
        let dt = parse_datetime("Wednesday, November 5, 2025 9:52 PM").expect("should parse");
        assert_eq!(dt.hour(), 21);
    }

    #[test]
    fn parse_datetime_rejects_garbage() {
        assert!(parse_datetime("just now").is_none());
        assert!(parse_datetime("").is_none());
    }

    #[test]
    fn parse_report_count_handles_separators() {
        assert_eq!(parse_report_count("1,234"), Some(1234));
        assert_eq!(parse_report_count("17"), Some(17));
        assert_eq!(parse_report_count("n/a"), None);
    }

    #[test]
    fn parse_percent_variants() {
        assert_eq!(parse_percent("55%"), Some(55));
        assert_eq!(parse_percent("Internet (42%)"), Some(42));
        assert_eq!(parse_percent("100%"), Some(100));
        assert_eq!(parse_percent("250%"), None);
        assert_eq!(parse_percent("Internet"), None);
    }

    #[test]
    fn strip_percent_annotation_removes_suffix() {
        assert_eq!(strip_percent_annotation("Internet (55%)"), "Internet");
        assert_eq!(strip_percent_annotation("Total Blackout (7%)"), "Total Blackout");
        assert_eq!(strip_percent_annotation("Phone"), "Phone");
    }
}
