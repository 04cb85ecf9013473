use std::time::Duration;

use async_trait::async_trait;
use sentinel_domain::{ApiName, IamPolicy, ServiceState};

use crate::error::DriverError;

/// The three remote services a sentinel talks to: service usage, the
/// project IAM policy, and Secret Manager.
///
/// Every method addresses one project explicitly; implementations hold no
/// per-project state.
#[async_trait]
pub trait CloudApi: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Acquire credentials once. A failure here means no other call can succeed.
    async fn preflight(&self) -> Result<(), DriverError>;

    // ── Service usage ─────────────────────────────────────────────────────────

    /// Classify the enablement state of `api`. Never fails; transport and
    /// provider errors are folded into the returned state.
    async fn get_service(&self, project: &str, api: &ApiName) -> ServiceState;

    /// Request enablement and block until the operation finishes or `timeout`
    /// elapses.
    async fn enable_service(
        &self,
        project: &str,
        api: &ApiName,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    // ── IAM ───────────────────────────────────────────────────────────────────

    async fn get_iam_policy(&self, project: &str) -> Result<IamPolicy, DriverError>;

    /// Replace the whole project policy. The policy's etag is sent back so a
    /// write based on an outdated read fails with [`DriverError::Conflict`].
    async fn set_iam_policy(
        &self,
        project: &str,
        policy: &IamPolicy,
    ) -> Result<IamPolicy, DriverError>;

    // ── Secret Manager ────────────────────────────────────────────────────────

    /// Create an empty secret container. Returns [`DriverError::AlreadyExists`]
    /// when a secret with this id is already present.
    async fn create_secret(
        &self,
        project: &str,
        secret_id: &str,
        location: &str,
    ) -> Result<(), DriverError>;

    /// Append a version holding `payload` and return the version's resource name.
    async fn add_secret_version(
        &self,
        project: &str,
        secret_id: &str,
        payload: &[u8],
    ) -> Result<String, DriverError>;
}
