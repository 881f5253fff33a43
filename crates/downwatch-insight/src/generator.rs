//! Insight generation behind a swappable interface.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use downwatch_scraper::Snapshot;

use crate::client::OpenRouterClient;
use crate::error::InsightError;
use crate::prompt;
use crate::report::{
    Hotspot, InsightPayload, InsightReport, SentimentBreakdown, SentimentSample,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns a snapshot into a validated [`InsightReport`].
///
/// Object-safe so the server can hold a `Arc<dyn GenerateInsights>` and
/// tests can substitute [`StaticGenerator`] for the external gateway.
pub trait GenerateInsights: Send + Sync {
    fn generate<'a>(
        &'a self,
        service_name: &'a str,
        snapshot_id: &'a str,
        snapshot: &'a Snapshot,
    ) -> BoxFuture<'a, Result<InsightReport, InsightError>>;
}

/// Production generator: prompts the OpenRouter gateway and validates
/// whatever comes back.
pub struct OpenRouterGenerator {
    client: OpenRouterClient,
}

impl OpenRouterGenerator {
    #[must_use]
    pub fn new(client: OpenRouterClient) -> Self {
        Self { client }
    }
}

impl GenerateInsights for OpenRouterGenerator {
    fn generate<'a>(
        &'a self,
        service_name: &'a str,
        snapshot_id: &'a str,
        snapshot: &'a Snapshot,
    ) -> BoxFuture<'a, Result<InsightReport, InsightError>> {
        Box::pin(async move {
            let prompt = prompt::dashboard_prompt(service_name, snapshot);
            tracing::info!(
                service = service_name,
                snapshot_id,
                model = self.client.model(),
                "requesting insight report"
            );
            let content = self.client.chat(&prompt).await?;

            let mut payload: InsightPayload =
                serde_json::from_str(&content).map_err(|e| InsightError::Deserialize {
                    context: service_name.to_owned(),
                    source: e,
                })?;
            payload.validate();
            payload.provider = service_name.to_owned();

            Ok(InsightReport {
                snapshot_id: snapshot_id.to_owned(),
                generated_at: Utc::now(),
                model: self.client.model().to_owned(),
                payload,
            })
        })
    }
}

/// Generator used when no API key is configured. Always fails with
/// [`InsightError::MissingApiKey`] so scraping endpoints keep working while
/// insight endpoints report the misconfiguration.
pub struct DisabledGenerator;

impl GenerateInsights for DisabledGenerator {
    fn generate<'a>(
        &'a self,
        _service_name: &'a str,
        _snapshot_id: &'a str,
        _snapshot: &'a Snapshot,
    ) -> BoxFuture<'a, Result<InsightReport, InsightError>> {
        Box::pin(async { Err(InsightError::MissingApiKey) })
    }
}

/// Deterministic generator for tests and offline runs: derives every score
/// from the snapshot itself and counts invocations.
#[derive(Default)]
pub struct StaticGenerator {
    calls: AtomicU32,
}

impl StaticGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `generate` has been invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenerateInsights for StaticGenerator {
    fn generate<'a>(
        &'a self,
        service_name: &'a str,
        snapshot_id: &'a str,
        snapshot: &'a Snapshot,
    ) -> BoxFuture<'a, Result<InsightReport, InsightError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let total = snapshot.total_location_reports();
        let (status, status_color, pain_index) = if total >= 1000 {
            ("major issues", "red", 8.0)
        } else if total >= 100 {
            ("moderate", "yellow", 5.0)
        } else {
            ("good", "green", 1.5)
        };

        let mut hotspots: Vec<Hotspot> = snapshot
            .records
            .iter()
            .filter(|r| r.source == downwatch_scraper::RecordSource::LocationTotal)
            .filter_map(|r| {
                r.location.as_deref().map(|city| Hotspot {
                    city: city.to_owned(),
                    reports_count: i64::from(r.reports),
                    severity: "medium".to_owned(),
                    top_issue: None,
                })
            })
            .collect();
        hotspots.sort_by(|a, b| b.reports_count.cmp(&a.reports_count));

        let samples: Vec<SentimentSample> = snapshot
            .records
            .iter()
            .filter_map(|r| r.complaint.as_deref())
            .map(|text| SentimentSample {
                text: text.to_owned(),
                tone: "negative".to_owned(),
                time_ago: None,
            })
            .collect();

        let mut payload = InsightPayload {
            provider: service_name.to_owned(),
            status: status.to_owned(),
            status_color: status_color.to_owned(),
            star_rating: snapshot.star_rating.as_ref().map_or(0.0, |r| r.current),
            total_reports_24h: i64::try_from(total).unwrap_or(i64::MAX),
            pain_index,
            sentiment: SentimentBreakdown {
                negative: 60.0,
                neutral: 30.0,
                positive: 10.0,
                samples,
            },
            hotspots,
            active_outages: vec![],
            recent_activity: vec![],
            problem_distribution: vec![],
            trend: "stable".to_owned(),
            critical_insights: vec![format!("{total} reports across tracked locations")],
            recommendations: vec![],
            summary: format!("Synthetic report for {service_name}."),
        };
        payload.validate();

        let report = InsightReport {
            snapshot_id: snapshot_id.to_owned(),
            generated_at: Utc::now(),
            model: "static".to_owned(),
            payload,
        };
        Box::pin(async move { Ok(report) })
    }
}
