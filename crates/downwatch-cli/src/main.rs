mod pipeline;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "downwatch")]
#[command(about = "Telecom outage scraping and insight reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape (if stale) and generate an insight report for one provider.
    Analyze {
        /// Provider slug, e.g. `t-mobile`.
        service: String,
    },
    /// Analyze every configured provider concurrently.
    AnalyzeAll,
    /// Ensure a fresh snapshot exists for one provider, scraping if needed.
    Ensure {
        /// Provider slug, e.g. `t-mobile`.
        service: String,
    },
    /// Print the cross-provider comparison from stored data.
    Compare,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = downwatch_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let pipeline = Pipeline::from_config(&config)?;

    match cli.command {
        Commands::Analyze { service } => {
            let report = pipeline.analyze(&service).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::AnalyzeAll => pipeline.analyze_all().await?,
        Commands::Ensure { service } => {
            let (snapshot_id, refreshed) = pipeline.ensure(&service).await?;
            println!(
                "{snapshot_id} ({})",
                if refreshed { "scraped" } else { "fresh" }
            );
        }
        Commands::Compare => {
            let comparison = pipeline.compare()?;
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
    }

    Ok(())
}
