use std::path::Path;
use std::time::Duration;

use sentinel_domain::{ApiName, Role};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::raw::RawConfig;

pub const DEFAULT_LOCATION: &str = "global";

/// Upper bound on waiting for a single service-enable operation.
pub const DEFAULT_API_ENABLE_TIMEOUT_SECS: u64 = 300;

/// APIs that dependent agents need in every project.
pub const DEFAULT_REQUIRED_APIS: &[&str] = &[
    "serviceusage.googleapis.com",
    "iam.googleapis.com",
    "secretmanager.googleapis.com",
    "cloudbuild.googleapis.com",
    "cloudresourcemanager.googleapis.com",
    "logging.googleapis.com",
    "monitoring.googleapis.com",
];

/// Roles every service account in the project is expected to hold.
pub const DEFAULT_CRITICAL_ROLES: &[&str] = &[
    "roles/secretmanager.secretAccessor",
    "roles/secretmanager.secretVersionManager",
    "roles/cloudbuild.builds.builder",
    "roles/logging.logWriter",
    "roles/monitoring.metricWriter",
];

/// Fully resolved settings for one sentinel instance.
///
/// The API and role sets are fixed once this is built; nothing at runtime
/// changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentinelConfig {
    pub project_id: String,
    /// Secret Manager location; `global` means automatic replication.
    pub location: String,
    pub required_apis: Vec<ApiName>,
    pub critical_roles: Vec<Role>,
    pub api_enable_timeout: Duration,
    /// How many times `ensure_role` re-reads and retries after the provider
    /// rejects a stale policy write. Zero means a single attempt.
    pub policy_conflict_retries: u32,
}

impl SentinelConfig {
    /// Built-in defaults for `project_id` in `location`.
    pub fn new(project_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            required_apis: DEFAULT_REQUIRED_APIS.iter().map(|a| ApiName::new(*a)).collect(),
            critical_roles: DEFAULT_CRITICAL_ROLES.iter().map(|r| Role::new(*r)).collect(),
            api_enable_timeout: Duration::from_secs(DEFAULT_API_ENABLE_TIMEOUT_SECS),
            policy_conflict_retries: 0,
        }
    }
}

/// Values supplied on the command line or via environment; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub project_id: Option<String>,
    pub location: Option<String>,
}

/// Load `path` (if given), apply `overrides`, and validate the result.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<SentinelConfig, ConfigError> {
    let raw = match path {
        Some(path) => {
            debug!("Loading sentinel config from {}", path.display());
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            parse_raw(&content, &path.display().to_string())?
        }
        None => RawConfig::default(),
    };
    convert(raw, overrides)
}

/// Parse a YAML document directly. `origin` is only used in error messages.
pub fn parse_config(content: &str, origin: &str, overrides: Overrides) -> Result<SentinelConfig, ConfigError> {
    convert(parse_raw(content, origin)?, overrides)
}

fn parse_raw(content: &str, origin: &str) -> Result<RawConfig, ConfigError> {
    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
        path: origin.to_string(),
        source: e,
    })
}

fn convert(raw: RawConfig, overrides: Overrides) -> Result<SentinelConfig, ConfigError> {
    let project_id = overrides
        .project_id
        .or(raw.project_id)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or(ConfigError::MissingProject)?;
    if project_id.contains('/') || project_id.contains(char::is_whitespace) {
        return Err(ConfigError::Invalid {
            field: "project_id",
            message: format!("'{}' is not a project id", project_id),
        });
    }

    let location = overrides
        .location
        .or(raw.location)
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    if location.is_empty() || location.contains('/') {
        return Err(ConfigError::Invalid {
            field: "location",
            message: format!("'{}' is not a location", location),
        });
    }

    let mut config = SentinelConfig::new(project_id, location);

    if let Some(apis) = raw.required_apis {
        let parsed = apis
            .iter()
            .map(|a| ApiName::parse(a))
            .collect::<Result<Vec<_>, _>>()?;
        config.required_apis = dedup("required_apis", parsed);
    }
    if let Some(roles) = raw.critical_roles {
        let parsed = roles
            .iter()
            .map(|r| Role::parse(r))
            .collect::<Result<Vec<_>, _>>()?;
        config.critical_roles = dedup("critical_roles", parsed);
    }
    if let Some(secs) = raw.api_enable_timeout_secs {
        if secs == 0 {
            return Err(ConfigError::Invalid {
                field: "api_enable_timeout_secs",
                message: "must be greater than zero".into(),
            });
        }
        config.api_enable_timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = raw.policy_conflict_retries {
        config.policy_conflict_retries = retries;
    }

    Ok(config)
}

/// Drop repeated entries, keeping first-seen order.
fn dedup<T: PartialEq + std::fmt::Display>(field: &str, items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if out.contains(&item) {
            warn!(field, entry = %item, "Ignoring duplicate config entry");
            continue;
        }
        out.push(item);
    }
    out
}
