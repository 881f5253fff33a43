//! Shared scrape-and-analyze pipeline behind the CLI subcommands.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use downwatch_core::{AppConfig, ServiceConfig, ServicesFile};
use downwatch_insight::{
    compare_services, ComparisonResult, GenerateInsights, InsightReport, OpenRouterClient,
    OpenRouterGenerator,
};
use downwatch_scraper::{extract_snapshot, PageClient, Snapshot};
use downwatch_store::{FsStore, ReportStore, SnapshotStore};
use futures::stream::{self, StreamExt};

/// Providers analyzed concurrently by `analyze-all`.
const ANALYZE_CONCURRENCY: usize = 8;

pub struct Pipeline {
    services: Arc<ServicesFile>,
    snapshots: SnapshotStore,
    reports: ReportStore,
    pages: PageClient,
    generator: Option<OpenRouterGenerator>,
    snapshot_max_age: chrono::Duration,
}

impl Pipeline {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let services = Arc::new(downwatch_core::load_services(&config.services_path)?);
        let snapshots = SnapshotStore::new(Arc::new(FsStore::open(
            config.data_dir.join("snapshots"),
        )?));
        let reports = ReportStore::new(Arc::new(FsStore::open(config.data_dir.join("reports"))?));

        let pages = PageClient::with_base_url(
            config.scraper_request_timeout_secs,
            &config.scraper_user_agent,
            config.scraper_max_retries,
            config.scraper_retry_backoff_base_secs,
            &config.scraper_base_url,
        )?;

        let generator = config
            .openrouter_api_key
            .as_deref()
            .map(|key| {
                OpenRouterClient::with_base_url(
                    key,
                    &config.insight_model,
                    config.insight_timeout_secs,
                    &config.openrouter_base_url,
                )
                .map(OpenRouterGenerator::new)
            })
            .transpose()?;

        Ok(Self {
            services,
            snapshots,
            reports,
            pages,
            generator,
            snapshot_max_age: chrono::Duration::seconds(
                i64::try_from(config.snapshot_max_age_secs).unwrap_or(i64::MAX),
            ),
        })
    }

    fn service(&self, slug: &str) -> anyhow::Result<ServiceConfig> {
        self.services
            .find(slug)
            .cloned()
            .with_context(|| format!("unknown service: '{slug}'"))
    }

    /// Returns a fresh snapshot id for the provider, scraping when the
    /// stored one is missing or stale.
    pub async fn ensure(&self, slug: &str) -> anyhow::Result<(String, bool)> {
        let service = self.service(slug)?;
        let (id, _, refreshed) = self.ensure_snapshot(&service).await?;
        Ok((id, refreshed))
    }

    async fn ensure_snapshot(
        &self,
        service: &ServiceConfig,
    ) -> anyhow::Result<(String, Snapshot, bool)> {
        let slug = service.slug();
        if let Some(id) = self.snapshots.fresh(&slug, self.snapshot_max_age)? {
            let snapshot = self.snapshots.load(&id)?;
            return Ok((id, snapshot, false));
        }

        let (problems_html, map_html) = tokio::try_join!(
            self.pages.fetch_problems_page(&slug),
            self.pages.fetch_map_page(&slug),
        )
        .with_context(|| format!("failed to scrape '{slug}'"))?;

        let snapshot = extract_snapshot(&slug, Utc::now(), &problems_html, &map_html);
        let id = self.snapshots.save(&snapshot)?;
        Ok((id, snapshot, true))
    }

    /// Full pipeline for one provider: fresh snapshot, insight report,
    /// persisted under `{slug}.json`.
    pub async fn analyze(&self, slug: &str) -> anyhow::Result<InsightReport> {
        let service = self.service(slug)?;
        let generator = self
            .generator
            .as_ref()
            .context("OPENROUTER_API_KEY is required for analyze")?;

        let (snapshot_id, snapshot, refreshed) = self.ensure_snapshot(&service).await?;
        tracing::info!(service = %service.name, %snapshot_id, refreshed, "analyzing");

        let report = generator
            .generate(&service.name, &snapshot_id, &snapshot)
            .await?;
        self.reports.save(&service.report_filename(), &report)?;
        Ok(report)
    }

    /// Analyzes every configured provider with bounded concurrency.
    /// A single provider failing does not abort the rest.
    pub async fn analyze_all(&self) -> anyhow::Result<()> {
        let slugs: Vec<String> = self.services.services.iter().map(ServiceConfig::slug).collect();
        let total = slugs.len();

        let failures = stream::iter(slugs)
            .map(|slug| async move {
                match self.analyze(&slug).await {
                    Ok(report) => {
                        println!(
                            "{slug}: pain {:.1}, {} reports",
                            report.payload.pain_index, report.payload.total_reports_24h
                        );
                        0_usize
                    }
                    Err(e) => {
                        tracing::error!(service = %slug, error = %e, "analyze failed");
                        eprintln!("{slug}: failed: {e:#}");
                        1
                    }
                }
            })
            .buffer_unordered(ANALYZE_CONCURRENCY)
            .fold(0_usize, |acc, failed| async move { acc + failed })
            .await;

        if failures > 0 {
            anyhow::bail!("{failures} of {total} providers failed");
        }
        Ok(())
    }

    pub fn compare(&self) -> anyhow::Result<ComparisonResult> {
        Ok(compare_services(
            &self.services,
            &self.snapshots,
            &self.reports,
        )?)
    }
}
