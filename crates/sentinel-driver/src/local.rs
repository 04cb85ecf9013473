use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sentinel_domain::{ApiName, Binding, IamPolicy, ServiceState};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cloud::CloudApi;
use crate::error::DriverError;

/// One recorded call against a [`LocalCloud`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Preflight,
    GetService(ApiName),
    EnableService(ApiName),
    GetIamPolicy,
    SetIamPolicy,
    CreateSecret(String),
    AddSecretVersion(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSecret {
    pub location: String,
    pub versions: Vec<Vec<u8>>,
}

/// Everything a [`LocalCloud`] knows, plus the faults it should inject.
#[derive(Debug, Clone, Default)]
pub struct LocalState {
    pub enabled: BTreeSet<ApiName>,
    /// Forced answers for `get_service`, overriding `enabled`.
    pub service_overrides: BTreeMap<ApiName, ServiceState>,
    /// APIs whose enable request fails.
    pub failing_enables: BTreeSet<ApiName>,
    pub policy: IamPolicy,
    pub policy_read_error: Option<String>,
    pub policy_write_error: Option<String>,
    /// Edits another actor applies just before each of the next
    /// `set_iam_policy` calls; each one bumps the etag.
    pub concurrent_edits: VecDeque<Binding>,
    pub secrets: BTreeMap<String, LocalSecret>,
    pub secret_write_error: Option<String>,
    pub auth_error: Option<String>,
    pub calls: Vec<Call>,
    /// Counter behind the `local-<n>` etags.
    pub generation: u64,
}

impl LocalState {
    fn bump_etag(&mut self) {
        self.generation += 1;
        self.policy.etag = Some(format!("local-{}", self.generation));
    }
}

/// An in-memory [`CloudApi`] for a single project.
///
/// - Keeps service, policy and secret state in memory; nothing leaves the process.
/// - Enforces etags on policy writes the way GCP does.
/// - Records every call so callers can assert on what was (not) issued.
#[derive(Debug, Clone)]
pub struct LocalCloud {
    inner: Arc<RwLock<LocalState>>,
}

impl Default for LocalCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCloud {
    pub fn new() -> Self {
        Self::from_state(LocalState::default())
    }

    pub fn from_state(mut state: LocalState) -> Self {
        if state.policy.etag.is_none() {
            state.bump_etag();
        }
        Self { inner: Arc::new(RwLock::new(state)) }
    }

    /// Copy of the current state, including the call log.
    pub async fn snapshot(&self) -> LocalState {
        self.inner.read().await.clone()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.inner.read().await.calls.clone()
    }

    async fn record(&self, call: Call) -> tokio::sync::RwLockWriteGuard<'_, LocalState> {
        let mut guard = self.inner.write().await;
        guard.calls.push(call);
        guard
    }
}

#[async_trait]
impl CloudApi for LocalCloud {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn preflight(&self) -> Result<(), DriverError> {
        let guard = self.record(Call::Preflight).await;
        match &guard.auth_error {
            Some(e) => Err(DriverError::Auth(e.clone())),
            None => Ok(()),
        }
    }

    async fn get_service(&self, project: &str, api: &ApiName) -> ServiceState {
        debug!(project, api = %api, "LocalCloud: get_service");
        let guard = self.record(Call::GetService(api.clone())).await;
        if let Some(state) = guard.service_overrides.get(api) {
            return state.clone();
        }
        if guard.enabled.contains(api) {
            ServiceState::Enabled
        } else {
            ServiceState::NotEnabled
        }
    }

    async fn enable_service(
        &self,
        project: &str,
        api: &ApiName,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        debug!(project, api = %api, "LocalCloud: enable_service");
        let mut guard = self.record(Call::EnableService(api.clone())).await;
        if guard.failing_enables.contains(api) {
            return Err(DriverError::Remote(format!(
                "FAILED_PRECONDITION: cannot enable {}",
                api
            )));
        }
        guard.enabled.insert(api.clone());
        Ok(())
    }

    async fn get_iam_policy(&self, project: &str) -> Result<IamPolicy, DriverError> {
        debug!(project, "LocalCloud: get_iam_policy");
        let guard = self.record(Call::GetIamPolicy).await;
        match &guard.policy_read_error {
            Some(e) => Err(DriverError::PermissionDenied(e.clone())),
            None => Ok(guard.policy.clone()),
        }
    }

    async fn set_iam_policy(
        &self,
        project: &str,
        policy: &IamPolicy,
    ) -> Result<IamPolicy, DriverError> {
        debug!(project, "LocalCloud: set_iam_policy");
        let mut guard = self.record(Call::SetIamPolicy).await;
        if let Some(e) = &guard.policy_write_error {
            return Err(DriverError::Remote(e.clone()));
        }
        if let Some(edit) = guard.concurrent_edits.pop_front() {
            guard.policy.bindings.push(edit);
            guard.bump_etag();
        }
        if policy.etag.is_some() && policy.etag != guard.policy.etag {
            return Err(DriverError::Conflict(
                "ABORTED: There were concurrent policy changes".into(),
            ));
        }
        guard.policy = policy.clone();
        guard.bump_etag();
        Ok(guard.policy.clone())
    }

    async fn create_secret(
        &self,
        project: &str,
        secret_id: &str,
        location: &str,
    ) -> Result<(), DriverError> {
        debug!(project, secret_id, "LocalCloud: create_secret");
        let mut guard = self.record(Call::CreateSecret(secret_id.to_string())).await;
        if let Some(e) = &guard.secret_write_error {
            return Err(DriverError::Remote(e.clone()));
        }
        if guard.secrets.contains_key(secret_id) {
            return Err(DriverError::AlreadyExists(format!(
                "projects/{}/secrets/{}",
                project, secret_id
            )));
        }
        guard.secrets.insert(
            secret_id.to_string(),
            LocalSecret { location: location.to_string(), versions: Vec::new() },
        );
        Ok(())
    }

    async fn add_secret_version(
        &self,
        project: &str,
        secret_id: &str,
        payload: &[u8],
    ) -> Result<String, DriverError> {
        debug!(project, secret_id, "LocalCloud: add_secret_version");
        let mut guard = self.record(Call::AddSecretVersion(secret_id.to_string())).await;
        if let Some(e) = &guard.secret_write_error {
            return Err(DriverError::Remote(e.clone()));
        }
        let secret = guard.secrets.get_mut(secret_id).ok_or_else(|| {
            DriverError::NotFound(format!("projects/{}/secrets/{}", project, secret_id))
        })?;
        secret.versions.push(payload.to_vec());
        Ok(format!(
            "projects/{}/secrets/{}/versions/{}",
            project,
            secret_id,
            secret.versions.len()
        ))
    }
}
