use std::sync::Arc;

use sentinel_config::SentinelConfig;
use sentinel_domain::{ApiName, Grant, Principal, Role, ServiceState};
use sentinel_driver::{CloudApi, DriverError, GcpCloud};
use tracing::{error, info, warn};

use crate::error::ReconcileError;

/// Deterministic Secret Manager id for a principal's key material:
/// `sa-key-` followed by the email with `@` and `.` replaced by `-`.
pub fn secret_id_for(principal: &Principal) -> String {
    format!("sa-key-{}", principal.as_str().replace(['@', '.'], "-"))
}

/// Facade over one project's service usage, IAM policy and Secret Manager.
///
/// Holds the cloud handle and the fixed API and role sets; no other state
/// survives between calls.
pub struct CloudSentinel {
    pub(crate) config: SentinelConfig,
    pub(crate) cloud: Arc<dyn CloudApi>,
}

impl CloudSentinel {
    pub fn new(config: SentinelConfig, cloud: Arc<dyn CloudApi>) -> Self {
        Self { config, cloud }
    }

    /// Build a sentinel backed by GCP with Application Default Credentials.
    ///
    /// Fails with [`ReconcileError::DependencyUnavailable`] when no credential
    /// source can be initialised; nothing else can run without one.
    pub async fn from_adc(config: SentinelConfig) -> Result<Self, ReconcileError> {
        let cloud = GcpCloud::from_adc()
            .await
            .map_err(|e| ReconcileError::DependencyUnavailable(e.to_string()))?;
        Ok(Self::new(config, Arc::new(cloud)))
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    pub fn required_apis(&self) -> &[ApiName] {
        &self.config.required_apis
    }

    pub fn critical_roles(&self) -> &[Role] {
        &self.config.critical_roles
    }

    // ── ensure_api ────────────────────────────────────────────────────────────

    /// Make sure `api` is enabled in the project.
    ///
    /// Returns `true` without issuing an enable request when the API is
    /// already on. Never fails: every error is logged and reported as `false`
    /// so one API cannot abort a pass over many.
    pub async fn ensure_api(&self, api: &ApiName) -> bool {
        let project = self.project_id();
        match self.cloud.get_service(project, api).await {
            ServiceState::Enabled => {
                info!(api = %api, "API already enabled");
                return true;
            }
            ServiceState::NotEnabled => {
                info!(api = %api, "API not enabled, attempting to enable");
            }
            ServiceState::PermissionError(msg) => {
                error!(api = %api, "Not allowed to read API state: {}", msg);
                return false;
            }
            ServiceState::TransientError(msg) => {
                error!(api = %api, "Failed to read API state: {}", msg);
                return false;
            }
        }

        match self
            .cloud
            .enable_service(project, api, self.config.api_enable_timeout)
            .await
        {
            Ok(()) => {
                info!(api = %api, "Enabled API");
                true
            }
            Err(e) => {
                error!(api = %api, "Failed to enable API: {}", e);
                false
            }
        }
    }

    // ── ensure_role ───────────────────────────────────────────────────────────

    /// Make sure `principal` holds `role` on the project.
    ///
    /// Reads the whole policy, adds the member locally (extending the
    /// existing binding for the role, or appending one), and writes the whole
    /// policy back. Already-held roles cause no write.
    ///
    /// The write carries the etag from the read, so when another actor
    /// changed the policy in between the provider rejects the write instead
    /// of silently dropping their change. The grant is then retried from a
    /// fresh read up to `policy_conflict_retries` times; with the default of
    /// zero it just fails. Writers that strip the etag still clobber each
    /// other, and nothing serialises two sentinels working on one project.
    pub async fn ensure_role(&self, principal: &Principal, role: &Role) -> bool {
        let mut attempt = 0u32;
        loop {
            match self.grant_role(principal, role).await {
                Ok(Grant::AlreadyPresent) => {
                    info!(principal = %principal, role = %role, "Role already assigned");
                    return true;
                }
                Ok(_) => {
                    info!(principal = %principal, role = %role, "Assigned role");
                    return true;
                }
                Err(DriverError::Conflict(msg)) if attempt < self.config.policy_conflict_retries => {
                    attempt += 1;
                    warn!(
                        principal = %principal,
                        role = %role,
                        attempt,
                        "IAM policy changed concurrently, retrying: {}",
                        msg
                    );
                }
                Err(e) => {
                    error!(principal = %principal, role = %role, "Failed to assign role: {}", e);
                    return false;
                }
            }
        }
    }

    async fn grant_role(&self, principal: &Principal, role: &Role) -> Result<Grant, DriverError> {
        let project = self.project_id();
        let mut policy = self.cloud.get_iam_policy(project).await?;
        let grant = policy.grant(principal, role);
        if grant != Grant::AlreadyPresent {
            self.cloud.set_iam_policy(project, &policy).await?;
        }
        Ok(grant)
    }

    // ── Secret Manager ────────────────────────────────────────────────────────

    /// Store `payload` as a new version of the principal's key secret,
    /// creating the secret first if needed. Never fails; returns `false` on
    /// any error.
    pub async fn store_key_in_secret_manager(&self, principal: &Principal, payload: &[u8]) -> bool {
        let project   = self.project_id();
        let secret_id = secret_id_for(principal);

        match self
            .cloud
            .create_secret(project, &secret_id, &self.config.location)
            .await
        {
            Ok(()) => info!(secret_id = %secret_id, "Created secret"),
            Err(DriverError::AlreadyExists(_)) => info!(secret_id = %secret_id, "Secret already exists"),
            Err(e) => {
                error!(secret_id = %secret_id, "Failed to store key in Secret Manager: {}", e);
                return false;
            }
        }

        match self.cloud.add_secret_version(project, &secret_id, payload).await {
            Ok(version) => {
                info!(secret_id = %secret_id, version = %version, "Added secret version");
                true
            }
            Err(e) => {
                error!(secret_id = %secret_id, "Failed to store key in Secret Manager: {}", e);
                false
            }
        }
    }
}
