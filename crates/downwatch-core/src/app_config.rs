use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub services_path: PathBuf,
    /// Root directory for the snapshot and report namespaces.
    pub data_dir: PathBuf,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub insight_model: String,
    pub insight_timeout_secs: u64,
    pub scraper_base_url: String,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    /// A snapshot younger than this is considered fresh by ensure-fresh.
    pub snapshot_max_age_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("services_path", &self.services_path)
            .field("data_dir", &self.data_dir)
            .field(
                "openrouter_api_key",
                &self.openrouter_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openrouter_base_url", &self.openrouter_base_url)
            .field("insight_model", &self.insight_model)
            .field("insight_timeout_secs", &self.insight_timeout_secs)
            .field("scraper_base_url", &self.scraper_base_url)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field("snapshot_max_age_secs", &self.snapshot_max_age_secs)
            .finish()
    }
}
