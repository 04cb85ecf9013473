use chrono::{DateTime, Utc};
use sentinel_domain::{ApiName, Principal, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    IssuesFound,
    Error,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Healthy => write!(f, "healthy"),
            OverallStatus::IssuesFound => write!(f, "issues_found"),
            OverallStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of the API enablement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiEnablement {
    pub enabled: Vec<ApiName>,
    pub failed: Vec<ApiName>,
}

/// Result of the IAM validation pass. Entries are `"<principal>:<role>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCheck {
    pub valid: Vec<String>,
    pub missing: Vec<String>,
}

impl PermissionCheck {
    pub fn entry(principal: &Principal, role: &Role) -> String {
        format!("{}:{}", principal, role)
    }
}

/// Result of the key rotation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRotation {
    pub rotated: Vec<String>,
    pub failed: Vec<String>,
}

/// Aggregate outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentReport {
    pub run_id: Uuid,
    pub project_id: String,
    pub apis_enabled: Vec<ApiName>,
    pub apis_failed: Vec<ApiName>,
    pub permissions_valid: Vec<String>,
    pub permissions_missing: Vec<String>,
    pub keys_rotated: Vec<String>,
    pub keys_failed: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub overall_status: OverallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnvironmentReport {
    /// An empty report. Its status stays `error` until [`conclude`](Self::conclude)
    /// runs, so a pass that never finishes cannot read as healthy.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            project_id: project_id.into(),
            apis_enabled: Vec::new(),
            apis_failed: Vec::new(),
            permissions_valid: Vec::new(),
            permissions_missing: Vec::new(),
            keys_rotated: Vec::new(),
            keys_failed: Vec::new(),
            timestamp: Utc::now(),
            overall_status: OverallStatus::Error,
            error: None,
        }
    }

    pub fn record_apis(&mut self, apis: ApiEnablement) {
        self.apis_enabled = apis.enabled;
        self.apis_failed = apis.failed;
    }

    pub fn record_permissions(&mut self, check: PermissionCheck) {
        self.permissions_valid = check.valid;
        self.permissions_missing = check.missing;
    }

    pub fn record_keys(&mut self, keys: KeyRotation) {
        self.keys_rotated = keys.rotated;
        self.keys_failed = keys.failed;
    }

    pub fn has_issues(&self) -> bool {
        !self.apis_failed.is_empty()
            || !self.permissions_missing.is_empty()
            || !self.keys_failed.is_empty()
    }

    /// Derive the status from the failure lists after every pass ran.
    pub fn conclude(&mut self) {
        self.overall_status = if self.has_issues() {
            OverallStatus::IssuesFound
        } else {
            OverallStatus::Healthy
        };
    }

    /// Mark the pass as aborted; whatever was recorded so far is kept.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.overall_status = OverallStatus::Error;
        self.error = Some(message.into());
    }
}
