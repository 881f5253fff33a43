//! Insight report model and post-parse validation.
//!
//! The model is asked for strict JSON, but LLM output drifts: scores come
//! back out of range, enums get creative spellings, arrays overflow their
//! caps. [`InsightPayload::validate`] normalizes everything in place so a
//! stored report always satisfies the dashboard contract, whatever the
//! model produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_HOTSPOTS: usize = 5;
const MAX_SENTIMENT_SAMPLES: usize = 4;
const MAX_CRITICAL_INSIGHTS: usize = 4;
const MAX_RECOMMENDATIONS: usize = 3;
const MAX_ACTIVE_OUTAGES: usize = 10;
const MAX_RECENT_ACTIVITY: usize = 8;

/// A validated insight report, as persisted and served.
///
/// `snapshot_id` always names the snapshot the report was generated from,
/// so any score can be traced back to the raw scrape it summarizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub snapshot_id: String,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    #[serde(flatten)]
    pub payload: InsightPayload,
}

/// The model-produced portion of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightPayload {
    pub provider: String,
    /// One of `good`, `moderate`, `major issues`.
    pub status: String,
    /// One of `green`, `yellow`, `red`.
    pub status_color: String,
    pub star_rating: f64,
    #[serde(default)]
    pub total_reports_24h: i64,
    pub pain_index: f64,
    pub sentiment: SentimentBreakdown,
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
    #[serde(default)]
    pub active_outages: Vec<ActiveOutage>,
    #[serde(default)]
    pub recent_activity: Vec<ActivityEvent>,
    #[serde(default)]
    pub problem_distribution: Vec<ProblemSlice>,
    /// One of `improving`, `stable`, `declining`.
    #[serde(default = "default_trend")]
    pub trend: String,
    #[serde(default)]
    pub critical_insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
    #[serde(default)]
    pub samples: Vec<SentimentSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSample {
    pub text: String,
    /// One of `negative`, `neutral`, `positive`.
    pub tone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ago: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub city: String,
    pub reports_count: i64,
    /// One of `high`, `medium`, `low`.
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_issue: Option<String>,
}

/// One currently-affected city from the issue feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveOutage {
    pub city: String,
    pub reason: String,
    /// One of `high`, `medium`, `low`.
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ago: Option<String>,
}

/// One timeline entry from the latest-reports table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub city: String,
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSlice {
    pub label: String,
    pub percent: f64,
}

fn default_trend() -> String {
    "stable".to_owned()
}

fn default_severity() -> String {
    "medium".to_owned()
}

fn clamp_round(value: f64, min: f64, max: f64, decimals: u32) -> f64 {
    let factor = f64::from(10_u32.pow(decimals));
    (value.clamp(min, max) * factor).round() / factor
}

fn normalize_enum(value: &mut String, allowed: &[&str], fallback: &str) {
    let lowered = value.trim().to_lowercase();
    if allowed.contains(&lowered.as_str()) {
        *value = lowered;
    } else {
        *value = fallback.to_owned();
    }
}

impl InsightPayload {
    /// Clamps scores into range, normalizes enum-like strings, rebalances
    /// the sentiment split to sum to 100, and truncates oversized arrays.
    pub fn validate(&mut self) {
        normalize_enum(
            &mut self.status,
            &["good", "moderate", "major issues"],
            "moderate",
        );
        normalize_enum(&mut self.status_color, &["green", "yellow", "red"], "yellow");
        normalize_enum(
            &mut self.trend,
            &["improving", "stable", "declining"],
            "stable",
        );

        self.star_rating = clamp_round(self.star_rating, 0.0, 5.0, 2);
        self.pain_index = clamp_round(self.pain_index, 0.0, 10.0, 1);
        self.total_reports_24h = self.total_reports_24h.max(0);

        self.sentiment.rebalance();

        self.hotspots.truncate(MAX_HOTSPOTS);
        for hotspot in &mut self.hotspots {
            hotspot.reports_count = hotspot.reports_count.max(0);
            normalize_enum(&mut hotspot.severity, &["high", "medium", "low"], "medium");
        }

        self.active_outages.truncate(MAX_ACTIVE_OUTAGES);
        for outage in &mut self.active_outages {
            normalize_enum(&mut outage.severity, &["high", "medium", "low"], "medium");
        }
        self.recent_activity.truncate(MAX_RECENT_ACTIVITY);

        for slice in &mut self.problem_distribution {
            slice.percent = clamp_round(slice.percent, 0.0, 100.0, 0);
        }

        self.critical_insights.truncate(MAX_CRITICAL_INSIGHTS);
        self.recommendations.truncate(MAX_RECOMMENDATIONS);
    }
}

impl SentimentBreakdown {
    /// Forces the negative/neutral/positive split onto whole percentages
    /// that sum to exactly 100, scaling proportionally when the model's
    /// arithmetic is off.
    fn rebalance(&mut self) {
        self.negative = self.negative.clamp(0.0, 100.0);
        self.neutral = self.neutral.clamp(0.0, 100.0);
        self.positive = self.positive.clamp(0.0, 100.0);

        let sum = self.negative + self.neutral + self.positive;
        if sum <= 0.0 {
            self.negative = 0.0;
            self.neutral = 100.0;
            self.positive = 0.0;
        } else {
            self.negative = (self.negative / sum * 100.0).round();
            self.neutral = (self.neutral / sum * 100.0).round();
            // Rounding error lands on positive so the split always sums
            // to 100.
            self.positive = 100.0 - self.negative - self.neutral;
        }

        self.samples.truncate(MAX_SENTIMENT_SAMPLES);
        for sample in &mut self.samples {
            normalize_enum(
                &mut sample.tone,
                &["negative", "neutral", "positive"],
                "neutral",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> InsightPayload {
        InsightPayload {
            provider: "T-Mobile".to_owned(),
            status: "moderate".to_owned(),
            status_color: "yellow".to_owned(),
            star_rating: 2.74,
            total_reports_24h: 1204,
            pain_index: 6.5,
            sentiment: SentimentBreakdown {
                negative: 60.0,
                neutral: 30.0,
                positive: 10.0,
                samples: vec![],
            },
            hotspots: vec![],
            active_outages: vec![],
            recent_activity: vec![],
            problem_distribution: vec![],
            trend: "stable".to_owned(),
            critical_insights: vec![],
            recommendations: vec![],
            summary: "Elevated complaint volume in Texas.".to_owned(),
        }
    }

    #[test]
    fn in_range_payload_is_untouched() {
        let mut p = payload();
        let before = p.clone();
        p.validate();
        assert_eq!(p, before);
    }

    #[test]
    fn scores_are_clamped_and_rounded() {
        let mut p = payload();
        p.star_rating = 7.123;
        p.pain_index = -3.0;
        p.total_reports_24h = -5;
        p.validate();
        assert_eq!(p.star_rating, 5.0);
        assert_eq!(p.pain_index, 0.0);
        assert_eq!(p.total_reports_24h, 0);
    }

    #[test]
    fn unknown_enums_fall_back() {
        let mut p = payload();
        p.status = "catastrophic".to_owned();
        p.status_color = "purple".to_owned();
        p.trend = "sideways".to_owned();
        p.validate();
        assert_eq!(p.status, "moderate");
        assert_eq!(p.status_color, "yellow");
        assert_eq!(p.trend, "stable");
    }

    #[test]
    fn enum_casing_is_normalized() {
        let mut p = payload();
        p.status = "Major Issues".to_owned();
        p.status_color = " RED ".to_owned();
        p.validate();
        assert_eq!(p.status, "major issues");
        assert_eq!(p.status_color, "red");
    }

    #[test]
    fn sentiment_is_rescaled_to_100() {
        let mut p = payload();
        p.sentiment.negative = 50.0;
        p.sentiment.neutral = 30.0;
        p.sentiment.positive = 40.0;
        p.validate();
        let s = &p.sentiment;
        assert_eq!(s.negative + s.neutral + s.positive, 100.0);
        assert_eq!(s.negative, 42.0);
    }

    #[test]
    fn all_zero_sentiment_defaults_to_neutral() {
        let mut p = payload();
        p.sentiment.negative = 0.0;
        p.sentiment.neutral = 0.0;
        p.sentiment.positive = 0.0;
        p.validate();
        assert_eq!(p.sentiment.neutral, 100.0);
    }

    #[test]
    fn oversized_arrays_are_truncated() {
        let mut p = payload();
        p.hotspots = (0..8)
            .map(|i| Hotspot {
                city: format!("City {i}"),
                reports_count: 10,
                severity: "high".to_owned(),
                top_issue: None,
            })
            .collect();
        p.critical_insights = (0..6).map(|i| format!("insight {i}")).collect();
        p.recommendations = (0..5).map(|i| format!("rec {i}")).collect();
        p.sentiment.samples = (0..7)
            .map(|i| SentimentSample {
                text: format!("sample {i}"),
                tone: "negative".to_owned(),
                time_ago: None,
            })
            .collect();
        p.active_outages = (0..14)
            .map(|i| ActiveOutage {
                city: format!("City {i}"),
                reason: "Internet".to_owned(),
                severity: "high".to_owned(),
                time_ago: None,
            })
            .collect();
        p.recent_activity = (0..11)
            .map(|i| ActivityEvent {
                city: format!("City {i}"),
                issue: "Phone".to_owned(),
                time: None,
            })
            .collect();
        p.validate();
        assert_eq!(p.hotspots.len(), 5);
        assert_eq!(p.critical_insights.len(), 4);
        assert_eq!(p.recommendations.len(), 3);
        assert_eq!(p.sentiment.samples.len(), 4);
        assert_eq!(p.active_outages.len(), 10);
        assert_eq!(p.recent_activity.len(), 8);
    }

    #[test]
    fn hotspot_severity_falls_back_to_medium() {
        let mut p = payload();
        p.hotspots = vec![Hotspot {
            city: "Austin, TX".to_owned(),
            reports_count: -2,
            severity: "extreme".to_owned(),
            top_issue: Some("No signal".to_owned()),
        }];
        p.validate();
        assert_eq!(p.hotspots[0].severity, "medium");
        assert_eq!(p.hotspots[0].reports_count, 0);
    }

    #[test]
    fn report_serializes_payload_flattened() {
        let report = InsightReport {
            snapshot_id: "t-mobile-20251105T215200Z.json".to_owned(),
            generated_at: "2025-11-05T22:00:00Z".parse().expect("timestamp"),
            model: "nvidia/nemotron-nano-9b-v2:free".to_owned(),
            payload: payload(),
        };
        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["provider"], "T-Mobile");
        assert_eq!(value["snapshot_id"], "t-mobile-20251105T215200Z.json");
        let back: InsightReport = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, report);
    }
}
