//! Shared configuration and reference data for Downwatch.
//!
//! Holds the monitored-provider registry (`services.yaml`) and the
//! environment-driven application configuration used by the server and CLI.

pub mod app_config;
pub mod config;
pub mod services;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use services::{load_services, ServiceConfig, ServicesFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read services file {path}: {source}")]
    ServicesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse services file: {0}")]
    ServicesFileParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
