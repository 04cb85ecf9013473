use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::StatusCode;
use sentinel_domain::{ApiName, IamPolicy, ServiceState};
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cloud::CloudApi;
use crate::error::DriverError;

// ── Base URLs (overridden in tests to point at a mock server) ─────────────────

#[derive(Clone)]
struct BaseUrls {
    serviceusage:    String,
    resourcemanager: String,
    secretmanager:   String,
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self {
            serviceusage:    "https://serviceusage.googleapis.com".into(),
            resourcemanager: "https://cloudresourcemanager.googleapis.com".into(),
            secretmanager:   "https://secretmanager.googleapis.com".into(),
        }
    }
}

// ── Token provider ────────────────────────────────────────────────────────────

/// Source of bearer tokens for GCP REST calls.
#[async_trait]
trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, DriverError>;
}

/// Production token provider backed by Application Default Credentials.
struct AdcTokenProvider {
    inner: std::sync::Arc<dyn gcp_auth::TokenProvider>,
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn token(&self) -> Result<String, DriverError> {
        let token = self
            .inner
            .token(&["https://www.googleapis.com/auth/cloud-platform"])
            .await
            .map_err(|e| DriverError::Auth(format!("GCP auth failed: {}", e)))?;
        Ok(token.as_str().to_string())
    }
}

/// Returns a fixed token without any network call.
#[cfg(test)]
struct StaticToken(String);

#[cfg(test)]
#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, DriverError> {
        Ok(self.0.clone())
    }
}

// ── GcpCloud ──────────────────────────────────────────────────────────────────

/// [`CloudApi`] over the public GCP REST endpoints.
pub struct GcpCloud {
    client: reqwest::Client,
    token:  Box<dyn TokenProvider>,
    base:   BaseUrls,
}

impl GcpCloud {
    /// Create a `GcpCloud` using Application Default Credentials.
    ///
    /// ADC resolution order:
    /// 1. `GOOGLE_APPLICATION_CREDENTIALS` env var (service account JSON key)
    /// 2. Workload Identity (when running on GCP)
    /// 3. `gcloud auth application-default login` for local dev
    pub async fn from_adc() -> Result<Self, DriverError> {
        let inner = gcp_auth::provider()
            .await
            .map_err(|e| DriverError::Auth(format!("Failed to initialise GCP ADC: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            token:  Box::new(AdcTokenProvider { inner }),
            base:   BaseUrls::default(),
        })
    }

    /// Test-only constructor with a fixed token and custom base URLs.
    #[cfg(test)]
    fn with_static_token(token: &str, base: BaseUrls) -> Self {
        Self {
            client: reqwest::Client::new(),
            token:  Box::new(StaticToken(token.to_string())),
            base,
        }
    }

    async fn bearer(&self) -> Result<String, DriverError> {
        self.token.token().await
    }

    // ── GCP error parsing ─────────────────────────────────────────────────────

    /// Convert a GCP REST error envelope into a human-readable message:
    ///   `"PERMISSION_DENIED: The caller does not have permission [IAM_PERMISSION_DENIED: serviceusage.services.enable]"`
    fn extract_gcp_error(body: &Value) -> String {
        let err = &body["error"];
        let status  = err["status"].as_str().unwrap_or("UNKNOWN");
        let message = err["message"].as_str().unwrap_or("unknown error");

        let detail_suffix = err["details"]
            .as_array()
            .and_then(|arr| arr.iter().find(|d| d["reason"].is_string()))
            .and_then(|d| {
                let reason = d["reason"].as_str()?;
                let meta_vals: Vec<&str> = d["metadata"]
                    .as_object()
                    .map(|m| m.values().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                Some(format!(" [{}: {}]", reason, meta_vals.join(", ")))
            })
            .unwrap_or_default();

        format!("{}: {}{}", status, message, detail_suffix)
    }

    /// Map a non-2xx response onto the driver error taxonomy.
    fn classify(status: StatusCode, body: &Value) -> DriverError {
        let msg = Self::extract_gcp_error(body);
        match status.as_u16() {
            401 => DriverError::Auth(msg),
            403 => DriverError::PermissionDenied(msg),
            404 => DriverError::NotFound(msg),
            // setIamPolicy reports an etag mismatch as 409 ABORTED; every
            // other 409 is a create that collided with an existing resource.
            409 if body["error"]["status"].as_str() == Some("ABORTED") => DriverError::Conflict(msg),
            409 => DriverError::AlreadyExists(msg),
            412 => DriverError::Conflict(msg),
            _ => DriverError::Remote(msg),
        }
    }

    // ── JSON helper ───────────────────────────────────────────────────────────

    async fn send_json(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<Value, DriverError> {
        let resp = req
            .send()
            .await
            .map_err(|e| DriverError::Remote(format!("{}: {}", what, e)))?;
        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or_default();
            return Err(Self::classify(status, &body));
        }
        resp.json()
            .await
            .map_err(|e| DriverError::Internal(format!("{} decode: {}", what, e)))
    }

    // ── Long-running operation polling ────────────────────────────────────────

    /// Poll a GCP long-running operation URL until it completes or `timeout`
    /// elapses.
    ///
    /// Backoff: 1 s, 2 s, 4 s, 8 s, 16 s, then 30 s, each sleep clipped to the
    /// remaining time.
    async fn wait_for_operation(
        &self,
        op_url: &str,
        timeout: Duration,
    ) -> Result<Value, DriverError> {
        let token    = self.bearer().await?;
        let deadline = Instant::now() + timeout;
        let delays   = [1u64, 2, 4, 8, 16, 30];
        let mut attempt = 0usize;

        loop {
            let resp = self
                .send_json(self.client.get(op_url).bearer_auth(&token), "poll operation")
                .await?;

            if resp["done"].as_bool().unwrap_or(false) {
                if resp.get("error").is_some() {
                    let msg = Self::extract_gcp_error(&json!({ "error": resp["error"] }));
                    return Err(DriverError::Remote(format!("operation failed: {}", msg)));
                }
                return Ok(resp["response"].clone());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DriverError::Timeout(format!(
                    "operation {} not done after {}s",
                    op_url,
                    timeout.as_secs()
                )));
            }
            let delay = Duration::from_secs(delays[attempt.min(delays.len() - 1)]);
            attempt += 1;
            tokio::time::sleep(delay.min(deadline - now)).await;
        }
    }

    fn service_url(&self, project: &str, api: &ApiName) -> String {
        format!("{}/v1/projects/{}/services/{}", self.base.serviceusage, project, api)
    }
}

// ── CloudApi impl ─────────────────────────────────────────────────────────────

#[async_trait]
impl CloudApi for GcpCloud {
    fn name(&self) -> &'static str {
        "gcp"
    }

    async fn preflight(&self) -> Result<(), DriverError> {
        self.bearer().await.map(|_| ())
    }

    // ── get_service ───────────────────────────────────────────────────────────

    async fn get_service(&self, project: &str, api: &ApiName) -> ServiceState {
        let token = match self.bearer().await {
            Ok(t) => t,
            Err(e) => return ServiceState::TransientError(e.to_string()),
        };
        let url = self.service_url(project, api);
        match self
            .send_json(self.client.get(&url).bearer_auth(&token), "get service")
            .await
        {
            Ok(service) => match service["state"].as_str() {
                Some("ENABLED") => ServiceState::Enabled,
                other => {
                    debug!(api = %api, state = ?other, "Service not enabled");
                    ServiceState::NotEnabled
                }
            },
            Err(DriverError::NotFound(_)) => ServiceState::NotEnabled,
            Err(DriverError::PermissionDenied(m)) | Err(DriverError::Auth(m)) => {
                ServiceState::PermissionError(m)
            }
            Err(e) => ServiceState::TransientError(e.to_string()),
        }
    }

    // ── enable_service ────────────────────────────────────────────────────────

    async fn enable_service(
        &self,
        project: &str,
        api: &ApiName,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let token = self.bearer().await?;
        let url   = format!("{}:enable", self.service_url(project, api));

        info!(project, api = %api, "Enabling service");
        // The bound covers the enable request and every poll, not just the sleeps.
        let enable = async {
            let op = self
                .send_json(self.client.post(&url).bearer_auth(&token).json(&json!({})), "enable service")
                .await?;

            if op["done"].as_bool().unwrap_or(false) {
                if op.get("error").is_some() {
                    let msg = Self::extract_gcp_error(&json!({ "error": op["error"] }));
                    return Err(DriverError::Remote(format!("operation failed: {}", msg)));
                }
                return Ok(());
            }

            let op_name = op["name"]
                .as_str()
                .ok_or_else(|| DriverError::Internal("enable service: no operation name".into()))?;
            let op_url = format!("{}/v1/{}", self.base.serviceusage, op_name);
            self.wait_for_operation(&op_url, timeout).await?;
            Ok::<(), DriverError>(())
        };

        match tokio::time::timeout(timeout, enable).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout(format!(
                "enabling {} not done after {}s",
                api,
                timeout.as_secs()
            ))),
        }
    }

    // ── IAM policy ────────────────────────────────────────────────────────────

    async fn get_iam_policy(&self, project: &str) -> Result<IamPolicy, DriverError> {
        let token = self.bearer().await?;
        let url   = format!("{}/v1/projects/{}:getIamPolicy", self.base.resourcemanager, project);
        let body  = self
            .send_json(
                self.client
                    .post(&url)
                    .bearer_auth(&token)
                    .json(&json!({ "options": { "requestedPolicyVersion": 3 } })),
                "get iam policy",
            )
            .await?;
        serde_json::from_value(body)
            .map_err(|e| DriverError::Internal(format!("get iam policy decode: {}", e)))
    }

    async fn set_iam_policy(
        &self,
        project: &str,
        policy: &IamPolicy,
    ) -> Result<IamPolicy, DriverError> {
        let token = self.bearer().await?;
        let url   = format!("{}/v1/projects/{}:setIamPolicy", self.base.resourcemanager, project);
        if policy.etag.is_none() {
            warn!(project, "Writing IAM policy without an etag; concurrent edits will be overwritten");
        }
        let body = self
            .send_json(
                self.client
                    .post(&url)
                    .bearer_auth(&token)
                    .json(&json!({ "policy": policy })),
                "set iam policy",
            )
            .await?;
        serde_json::from_value(body)
            .map_err(|e| DriverError::Internal(format!("set iam policy decode: {}", e)))
    }

    // ── Secret Manager ────────────────────────────────────────────────────────

    async fn create_secret(
        &self,
        project: &str,
        secret_id: &str,
        location: &str,
    ) -> Result<(), DriverError> {
        let token = self.bearer().await?;
        let url   = format!("{}/v1/projects/{}/secrets", self.base.secretmanager, project);
        let replication = if location == "global" {
            json!({ "automatic": {} })
        } else {
            json!({ "userManaged": { "replicas": [{ "location": location }] } })
        };
        self.send_json(
            self.client
                .post(&url)
                .bearer_auth(&token)
                .query(&[("secretId", secret_id)])
                .json(&json!({ "replication": replication })),
            "create secret",
        )
        .await?;
        Ok(())
    }

    async fn add_secret_version(
        &self,
        project: &str,
        secret_id: &str,
        payload: &[u8],
    ) -> Result<String, DriverError> {
        let token = self.bearer().await?;
        let url = format!(
            "{}/v1/projects/{}/secrets/{}:addVersion",
            self.base.secretmanager, project, secret_id
        );
        let version = self
            .send_json(
                self.client
                    .post(&url)
                    .bearer_auth(&token)
                    .json(&json!({ "payload": { "data": general_purpose::STANDARD.encode(payload) } })),
                "add secret version",
            )
            .await?;
        Ok(version["name"].as_str().unwrap_or_default().to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_domain::{Principal, Role};
    use wiremock::{
        matchers::{body_json, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    // ── Test helpers ──────────────────────────────────────────────────────────

    /// All base URLs point at one mock server; paths tell them apart.
    fn test_base(url: &str) -> BaseUrls {
        BaseUrls {
            serviceusage:    url.to_string(),
            resourcemanager: url.to_string(),
            secretmanager:   url.to_string(),
        }
    }

    fn cloud(server: &MockServer) -> GcpCloud {
        GcpCloud::with_static_token("fake-token", test_base(&server.uri()))
    }

    fn iam() -> ApiName {
        ApiName::new("iam.googleapis.com")
    }

    async fn mount_service_state(server: &MockServer, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path("/v1/projects/p1/services/iam.googleapis.com"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    // ── GCP error parsing (pure, no mocking) ──────────────────────────────────

    #[test]
    fn parse_gcp_error_simple() {
        let body = json!({
            "error": {
                "code":    403,
                "status":  "PERMISSION_DENIED",
                "message": "The caller does not have permission",
            }
        });
        let msg = GcpCloud::extract_gcp_error(&body);
        assert_eq!(msg, "PERMISSION_DENIED: The caller does not have permission");
    }

    #[test]
    fn parse_gcp_error_with_error_info_details() {
        let body = json!({
            "error": {
                "code":    403,
                "status":  "PERMISSION_DENIED",
                "message": "The caller does not have permission",
                "details": [
                    { "@type": "type.googleapis.com/google.rpc.Help" },
                    {
                        "@type":   "type.googleapis.com/google.rpc.ErrorInfo",
                        "reason":  "IAM_PERMISSION_DENIED",
                        "domain":  "iam.googleapis.com",
                        "metadata": { "permission": "serviceusage.services.enable" },
                    },
                ],
            }
        });
        let msg = GcpCloud::extract_gcp_error(&body);
        assert!(msg.contains("PERMISSION_DENIED"), "status not in message");
        assert!(msg.contains("IAM_PERMISSION_DENIED"), "reason not in message");
        assert!(msg.contains("serviceusage.services.enable"), "metadata not in message");
    }

    #[test]
    fn parse_gcp_error_missing_fields_gives_fallback() {
        let body = json!({ "error": {} });
        let msg = GcpCloud::extract_gcp_error(&body);
        assert_eq!(msg, "UNKNOWN: unknown error");
    }

    #[test]
    fn classify_409_distinguishes_aborted_from_already_exists() {
        let aborted = json!({ "error": { "status": "ABORTED", "message": "etag mismatch" } });
        let exists  = json!({ "error": { "status": "ALREADY_EXISTS", "message": "exists" } });
        assert!(matches!(GcpCloud::classify(StatusCode::CONFLICT, &aborted), DriverError::Conflict(_)));
        assert!(matches!(GcpCloud::classify(StatusCode::CONFLICT, &exists), DriverError::AlreadyExists(_)));
        assert!(matches!(GcpCloud::classify(StatusCode::BAD_GATEWAY, &exists), DriverError::Remote(_)));
    }

    // ── get_service ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn get_service_enabled() {
        let server = MockServer::start().await;
        mount_service_state(&server, 200, json!({ "state": "ENABLED" })).await;
        assert_eq!(cloud(&server).get_service("p1", &iam()).await, ServiceState::Enabled);
    }

    #[tokio::test]
    async fn get_service_disabled_is_not_enabled() {
        let server = MockServer::start().await;
        mount_service_state(&server, 200, json!({ "state": "DISABLED" })).await;
        assert_eq!(cloud(&server).get_service("p1", &iam()).await, ServiceState::NotEnabled);
    }

    #[tokio::test]
    async fn get_service_404_is_not_enabled() {
        let server = MockServer::start().await;
        mount_service_state(&server, 404, json!({ "error": { "status": "NOT_FOUND", "message": "nope" } })).await;
        assert_eq!(cloud(&server).get_service("p1", &iam()).await, ServiceState::NotEnabled);
    }

    #[tokio::test]
    async fn get_service_403_is_permission_error() {
        let server = MockServer::start().await;
        mount_service_state(
            &server,
            403,
            json!({ "error": { "status": "PERMISSION_DENIED", "message": "denied" } }),
        )
        .await;
        let state = cloud(&server).get_service("p1", &iam()).await;
        assert_eq!(state, ServiceState::PermissionError("PERMISSION_DENIED: denied".into()));
    }

    #[tokio::test]
    async fn get_service_500_is_transient() {
        let server = MockServer::start().await;
        mount_service_state(&server, 500, json!({ "error": { "status": "INTERNAL", "message": "boom" } })).await;
        let state = cloud(&server).get_service("p1", &iam()).await;
        assert!(matches!(state, ServiceState::TransientError(m) if m.contains("INTERNAL")));
    }

    // ── enable_service ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn enable_service_done_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/services/iam.googleapis.com:enable"))
            .and(header("authorization", "Bearer fake-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/noop.DONE_OPERATION",
                "done": true,
                "response": {},
            })))
            .expect(1)
            .mount(&server)
            .await;

        cloud(&server)
            .enable_service("p1", &iam(), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn enable_service_polls_operation_until_done() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/services/iam.googleapis.com:enable"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/acf.123",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/operations/acf.123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/acf.123",
                "done": true,
                "response": { "service": { "state": "ENABLED" } },
            })))
            .expect(1)
            .mount(&server)
            .await;

        cloud(&server)
            .enable_service("p1", &iam(), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn enable_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/services/iam.googleapis.com:enable"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/acf.slow",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/operations/acf.slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/acf.slow",
                "done": false,
            })))
            .mount(&server)
            .await;

        let err = cloud(&server)
            .enable_service("p1", &iam(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Timeout(_)));
    }

    #[tokio::test]
    async fn enable_service_hung_request_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/services/iam.googleapis.com:enable"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "name": "operations/acf.hung", "done": true }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let err = cloud(&server)
            .enable_service("p1", &iam(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn enable_service_failed_operation_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/services/iam.googleapis.com:enable"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/acf.bad",
                "done": true,
                "error": { "code": 9, "status": "FAILED_PRECONDITION", "message": "billing disabled" },
            })))
            .mount(&server)
            .await;

        let err = cloud(&server)
            .enable_service("p1", &iam(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("FAILED_PRECONDITION"));
    }

    // ── IAM policy ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn get_iam_policy_requests_version_3() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1:getIamPolicy"))
            .and(body_json(json!({ "options": { "requestedPolicyVersion": 3 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": 1,
                "etag": "BwX1",
                "bindings": [{ "role": "roles/r1", "members": ["serviceAccount:a@x"] }],
            })))
            .mount(&server)
            .await;

        let policy = cloud(&server).get_iam_policy("p1").await.unwrap();
        assert_eq!(policy.etag.as_deref(), Some("BwX1"));
        assert!(policy.has_role(&Principal::new("a@x"), &Role::new("roles/r1")));
    }

    #[tokio::test]
    async fn set_iam_policy_sends_whole_policy_with_etag() {
        let server = MockServer::start().await;
        let mut policy: IamPolicy = serde_json::from_value(json!({
            "version": 1,
            "etag": "BwX1",
            "bindings": [{ "role": "roles/r1", "members": ["serviceAccount:a@x"] }],
        }))
        .unwrap();
        policy.grant(&Principal::new("b@x"), &Role::new("roles/r1"));

        Mock::given(method("POST"))
            .and(path("/v1/projects/p1:setIamPolicy"))
            .and(body_json(json!({
                "policy": {
                    "version": 1,
                    "etag": "BwX1",
                    "bindings": [{
                        "role": "roles/r1",
                        "members": ["serviceAccount:a@x", "serviceAccount:b@x"],
                    }],
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": 1,
                "etag": "BwX2",
                "bindings": [{
                    "role": "roles/r1",
                    "members": ["serviceAccount:a@x", "serviceAccount:b@x"],
                }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let written = cloud(&server).set_iam_policy("p1", &policy).await.unwrap();
        assert_eq!(written.etag.as_deref(), Some("BwX2"));
    }

    #[tokio::test]
    async fn set_iam_policy_stale_etag_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1:setIamPolicy"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {
                    "code": 409,
                    "status": "ABORTED",
                    "message": "There were concurrent policy changes.",
                }
            })))
            .mount(&server)
            .await;

        let err = cloud(&server)
            .set_iam_policy("p1", &IamPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Conflict(_)));
    }

    // ── Secret Manager ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_secret_global_uses_automatic_replication() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/secrets"))
            .and(query_param("secretId", "sa-key-a-x-com"))
            .and(body_json(json!({ "replication": { "automatic": {} } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p1/secrets/sa-key-a-x-com",
            })))
            .expect(1)
            .mount(&server)
            .await;

        cloud(&server).create_secret("p1", "sa-key-a-x-com", "global").await.unwrap();
    }

    #[tokio::test]
    async fn create_secret_regional_uses_user_managed_replica() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/secrets"))
            .and(body_json(json!({
                "replication": { "userManaged": { "replicas": [{ "location": "europe-west1" }] } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        cloud(&server).create_secret("p1", "s", "europe-west1").await.unwrap();
    }

    #[tokio::test]
    async fn create_secret_409_is_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/secrets"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "code": 409, "status": "ALREADY_EXISTS", "message": "Secret already exists" },
            })))
            .mount(&server)
            .await;

        let err = cloud(&server).create_secret("p1", "s", "global").await.unwrap_err();
        assert!(matches!(err, DriverError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn add_secret_version_sends_base64_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p1/secrets/s:addVersion"))
            .and(body_json(json!({ "payload": { "data": "a2V5LWJ5dGVz" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p1/secrets/s/versions/3",
                "state": "ENABLED",
            })))
            .mount(&server)
            .await;

        let version = cloud(&server)
            .add_secret_version("p1", "s", b"key-bytes")
            .await
            .unwrap();
        assert_eq!(version, "projects/p1/secrets/s/versions/3");
    }
}
