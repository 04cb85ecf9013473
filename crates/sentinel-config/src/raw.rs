use serde::{Deserialize, Serialize};

/// Raw YAML representation of a sentinel config file (sentinel.yml).
/// Every field is optional; absent fields fall back to the built-in defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub required_apis: Option<Vec<String>>,
    pub critical_roles: Option<Vec<String>>,
    pub api_enable_timeout_secs: Option<u64>,
    pub policy_conflict_retries: Option<u32>,
}
