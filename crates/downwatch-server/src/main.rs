mod api;
mod middleware;

use std::sync::Arc;

use downwatch_insight::{DisabledGenerator, GenerateInsights, OpenRouterClient, OpenRouterGenerator};
use downwatch_scraper::PageClient;
use downwatch_store::{FsStore, ReportStore, SnapshotStore};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = downwatch_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(?config, "starting downwatch server");

    let services = Arc::new(downwatch_core::load_services(&config.services_path)?);

    let snapshots = SnapshotStore::new(Arc::new(FsStore::open(
        config.data_dir.join("snapshots"),
    )?));
    let reports = ReportStore::new(Arc::new(FsStore::open(config.data_dir.join("reports"))?));

    let pages = Arc::new(PageClient::with_base_url(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_max_retries,
        config.scraper_retry_backoff_base_secs,
        &config.scraper_base_url,
    )?);

    let generator: Arc<dyn GenerateInsights> = match &config.openrouter_api_key {
        Some(key) => Arc::new(OpenRouterGenerator::new(OpenRouterClient::with_base_url(
            key,
            &config.insight_model,
            config.insight_timeout_secs,
            &config.openrouter_base_url,
        )?)),
        None if matches!(config.env, downwatch_core::Environment::Production) => {
            anyhow::bail!("OPENROUTER_API_KEY is required in production");
        }
        None => {
            tracing::warn!("OPENROUTER_API_KEY not set; insight endpoints disabled");
            Arc::new(DisabledGenerator)
        }
    };

    let state = AppState {
        services,
        snapshots,
        reports,
        pages,
        generator,
        snapshot_max_age: chrono::Duration::seconds(
            i64::try_from(config.snapshot_max_age_secs).unwrap_or(i64::MAX),
        ),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
