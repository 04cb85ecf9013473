use sentinel_config::SentinelConfig;
use tracing::{error, info};

use crate::error::ReconcileError;
use crate::report::{ApiEnablement, EnvironmentReport, KeyRotation, PermissionCheck};
use crate::sentinel::CloudSentinel;

impl CloudSentinel {
    /// Run the API, IAM and key passes in order and report on all three.
    ///
    /// Never fails. Per-resource failures land in the report's failure
    /// lists; a pass that aborts outright sets the status to `error`, keeps
    /// the message, and skips the passes after it.
    pub async fn ensure_environment(&self) -> EnvironmentReport {
        let mut report = EnvironmentReport::new(self.project_id());
        info!(run_id = %report.run_id, project = %report.project_id, "Starting environment reconciliation");

        match self.run_passes(&mut report).await {
            Ok(()) => report.conclude(),
            Err(e) => {
                error!(run_id = %report.run_id, "Environment reconciliation failed: {}", e);
                report.fail(e.to_string());
            }
        }

        info!(
            run_id = %report.run_id,
            status = %report.overall_status,
            apis_failed = report.apis_failed.len(),
            permissions_missing = report.permissions_missing.len(),
            "Environment reconciliation completed"
        );
        report
    }

    async fn run_passes(&self, report: &mut EnvironmentReport) -> Result<(), ReconcileError> {
        info!("Checking and enabling required APIs");
        report.record_apis(self.ensure_required_apis().await?);

        info!("Validating IAM permissions");
        report.record_permissions(self.validate_iam_permissions().await);

        info!("Checking service account key rotation");
        report.record_keys(self.rotate_service_account_keys().await);

        Ok(())
    }

    /// Enable every API in the required set, in order.
    ///
    /// Credentials are checked once up front; without them every call below
    /// would fail the same way, so that aborts the pass instead.
    async fn ensure_required_apis(&self) -> Result<ApiEnablement, ReconcileError> {
        self.cloud.preflight().await?;

        let mut result = ApiEnablement::default();
        for api in self.required_apis() {
            if self.ensure_api(api).await {
                result.enabled.push(api.clone());
            } else {
                result.failed.push(api.clone());
            }
        }
        Ok(result)
    }

    /// Check every critical role for every service account found in the
    /// project policy.
    ///
    /// Principals come from the policy's own bindings, sorted by email. If
    /// the policy cannot be read the result is a single `validation_error`
    /// entry in `missing`.
    async fn validate_iam_permissions(&self) -> PermissionCheck {
        let mut check = PermissionCheck::default();

        let policy = match self.cloud.get_iam_policy(self.project_id()).await {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to validate IAM permissions: {}", e);
                check.missing.push(format!("validation_error: {}", e));
                return check;
            }
        };

        for principal in policy.service_account_principals() {
            for role in self.critical_roles() {
                let entry = PermissionCheck::entry(&principal, role);
                if policy.has_role(&principal, role) {
                    check.valid.push(entry);
                } else {
                    check.missing.push(entry);
                }
            }
        }
        check
    }

    /// Key rotation is not implemented: this pass never rotates anything and
    /// always reports empty lists. [`store_key_in_secret_manager`] is the
    /// building block a real rotation would persist new keys with.
    ///
    /// [`store_key_in_secret_manager`]: CloudSentinel::store_key_in_secret_manager
    async fn rotate_service_account_keys(&self) -> KeyRotation {
        info!(project = %self.project_id(), "Key rotation is a no-op; no keys rotated");
        KeyRotation::default()
    }
}

/// One-shot health check for `project_id` against GCP with Application
/// Default Credentials and the default API and role sets.
///
/// Only fails when the GCP client cannot be constructed; everything after
/// that is reported inside the returned report.
pub async fn ensure_cloud_environment(
    project_id: &str,
    location: &str,
) -> Result<EnvironmentReport, ReconcileError> {
    let sentinel = CloudSentinel::from_adc(SentinelConfig::new(project_id, location)).await?;
    Ok(sentinel.ensure_environment().await)
}
