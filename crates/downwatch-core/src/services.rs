use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One monitored telecom provider from `services.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// The provider every other entry is compared against. Exactly one
    /// service in the registry carries this flag.
    #[serde(default)]
    pub baseline: bool,
    pub notes: Option<String>,
}

impl ServiceConfig {
    /// Generate a URL-safe slug from the provider name.
    ///
    /// The slug doubles as the path segment on the outage-aggregator site
    /// (`/problems/{slug}`) and as the key prefix in the snapshot store.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Conventional report filename for this provider.
    #[must_use]
    pub fn report_filename(&self) -> String {
        format!("{}.json", self.slug())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesFile {
    pub services: Vec<ServiceConfig>,
}

impl ServicesFile {
    /// Look up a service by its slug.
    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.slug() == slug)
    }

    /// The baseline provider. Validation guarantees exactly one exists.
    #[must_use]
    pub fn baseline(&self) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.baseline)
    }
}

/// Load and validate the service registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation (empty name, duplicate name/slug, not exactly one baseline).
pub fn load_services(path: &Path) -> Result<ServicesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ServicesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let services_file: ServicesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::ServicesFileParse)?;

    validate_services(&services_file)?;

    Ok(services_file)
}

fn validate_services(services_file: &ServicesFile) -> Result<(), ConfigError> {
    if services_file.services.is_empty() {
        return Err(ConfigError::Validation(
            "services list must be non-empty".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();
    let mut baselines = 0usize;

    for service in &services_file.services {
        if service.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "service name must be non-empty".to_string(),
            ));
        }

        if service.baseline {
            baselines += 1;
        }

        let lower_name = service.name.to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate service name: '{}'",
                service.name
            )));
        }

        let slug = service.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate service slug: '{}' (from service '{}')",
                slug, service.name
            )));
        }
    }

    if baselines != 1 {
        return Err(ConfigError::Validation(format!(
            "expected exactly one baseline service, found {baselines}"
        )));
    }

    Ok(())
}
