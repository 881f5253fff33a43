use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if env var values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if env var values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing/validation logic is decoupled from the actual environment so
/// it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("DOWNWATCH_ENV", "development"));
    let bind_addr = parse_addr("DOWNWATCH_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("DOWNWATCH_LOG_LEVEL", "info");
    let services_path = PathBuf::from(or_default(
        "DOWNWATCH_SERVICES_PATH",
        "./config/services.yaml",
    ));
    let data_dir = PathBuf::from(or_default("DOWNWATCH_DATA_DIR", "./data"));

    let openrouter_api_key = lookup("OPENROUTER_API_KEY").ok();
    let openrouter_base_url = or_default(
        "DOWNWATCH_OPENROUTER_BASE_URL",
        "https://openrouter.ai/api/v1",
    );
    let insight_model = or_default(
        "DOWNWATCH_INSIGHT_MODEL",
        "nvidia/nemotron-nano-9b-v2:free",
    );
    let insight_timeout_secs = parse_u64("DOWNWATCH_INSIGHT_TIMEOUT_SECS", "120")?;

    let scraper_base_url = or_default(
        "DOWNWATCH_SCRAPER_BASE_URL",
        "https://istheservicedown.com",
    );
    let scraper_request_timeout_secs = parse_u64("DOWNWATCH_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default(
        "DOWNWATCH_SCRAPER_USER_AGENT",
        "downwatch/0.1 (outage-monitoring)",
    );
    let scraper_max_retries = parse_u32("DOWNWATCH_SCRAPER_MAX_RETRIES", "3")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("DOWNWATCH_SCRAPER_RETRY_BACKOFF_BASE_SECS", "2")?;

    let snapshot_max_age_secs = parse_u64("DOWNWATCH_SNAPSHOT_MAX_AGE_SECS", "900")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        services_path,
        data_dir,
        openrouter_api_key,
        openrouter_base_url,
        insight_model,
        insight_timeout_secs,
        scraper_base_url,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        snapshot_max_age_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
