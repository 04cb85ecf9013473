use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::DomainError;

/// Member prefix GCP uses for service-account principals in policy bindings.
pub const SERVICE_ACCOUNT_PREFIX: &str = "serviceAccount:";

// ── Identifiers ──────────────────────────────────────────────────────────────

/// A service identifier such as `iam.googleapis.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiName(pub String);

impl ApiName {
    pub fn new(s: impl Into<String>) -> Self {
        ApiName(s.into())
    }

    /// Checked constructor used when the name comes from user input.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let s = s.trim();
        if s.is_empty() || !s.contains('.') || s.contains('/') || s.contains(char::is_whitespace) {
            return Err(DomainError::InvalidApiName(s.to_string()));
        }
        Ok(ApiName(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApiName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An IAM role identifier: `roles/...` for predefined roles, or a custom role
/// under `projects/<id>/roles/...` / `organizations/<id>/roles/...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    pub fn new(s: impl Into<String>) -> Self {
        Role(s.into())
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let s = s.trim();
        let predefined = s.strip_prefix("roles/").is_some_and(|rest| !rest.is_empty());
        let custom = (s.starts_with("projects/") || s.starts_with("organizations/"))
            && s.contains("/roles/")
            && !s.ends_with('/');
        if !(predefined || custom) {
            return Err(DomainError::InvalidRole(s.to_string()));
        }
        Ok(Role(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A service-account email. Bindings refer to it as `serviceAccount:<email>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(s: impl Into<String>) -> Self {
        Principal(s.into())
    }

    /// Accepts either a bare email or an already-prefixed `serviceAccount:` member.
    /// Any other member type (`user:`, `group:`, `deleted:...`) is rejected.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let s = s.trim();
        let email = s.strip_prefix(SERVICE_ACCOUNT_PREFIX).unwrap_or(s);
        if email.contains(':') {
            return Err(DomainError::InvalidPrincipal(s.to_string()));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Principal(email.to_string()))
            }
            _ => Err(DomainError::InvalidPrincipal(s.to_string())),
        }
    }

    /// Extract the principal from a binding member, if it is a service account.
    pub fn from_member(member: &str) -> Option<Self> {
        member
            .strip_prefix(SERVICE_ACCOUNT_PREFIX)
            .filter(|email| !email.is_empty())
            .map(Principal::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The policy member string for this principal.
    pub fn member(&self) -> String {
        format!("{}{}", SERVICE_ACCOUNT_PREFIX, self.0)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Service enablement ───────────────────────────────────────────────────────

/// Outcome of asking the provider whether a service is enabled.
///
/// The remote-call wrapper classifies the response so callers branch on a
/// tag instead of on error identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Enabled,
    /// Disabled, or unknown to the provider for this project.
    NotEnabled,
    TransientError(String),
    PermissionError(String),
}

// ── IAM policy ───────────────────────────────────────────────────────────────

/// One role and the members holding it.
///
/// Fields the provider returns that this crate does not interpret (for
/// instance `condition`) are kept in `extra` so a whole-policy write does
/// not drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub role: Role,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Binding {
    pub fn new(role: Role, members: Vec<String>) -> Self {
        Self { role, members, extra: Map::new() }
    }

    pub fn is_conditional(&self) -> bool {
        self.extra.contains_key("condition")
    }
}

/// What [`IamPolicy::grant`] had to do to the local copy of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The principal already held the role; the policy is untouched.
    AlreadyPresent,
    /// The principal was appended to an existing binding for the role.
    ExtendedBinding,
    /// No binding for the role existed; a new one was appended.
    NewBinding,
}

/// Snapshot of a project's IAM policy as returned by `getIamPolicy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IamPolicy {
    pub fn has_role(&self, principal: &Principal, role: &Role) -> bool {
        let member = principal.member();
        self.bindings
            .iter()
            .any(|b| &b.role == role && b.members.iter().any(|m| *m == member))
    }

    /// Add `principal` to `role` in this local copy.
    ///
    /// Extends the first unconditional binding for the role; appends a new
    /// binding only when none exists, so a role never gains a duplicate
    /// binding.
    pub fn grant(&mut self, principal: &Principal, role: &Role) -> Grant {
        if self.has_role(principal, role) {
            return Grant::AlreadyPresent;
        }
        let member = principal.member();
        match self
            .bindings
            .iter_mut()
            .find(|b| &b.role == role && !b.is_conditional())
        {
            Some(binding) => {
                binding.members.push(member);
                Grant::ExtendedBinding
            }
            None => {
                self.bindings.push(Binding::new(role.clone(), vec![member]));
                Grant::NewBinding
            }
        }
    }

    /// Every service account that appears as a member of any binding.
    pub fn service_account_principals(&self) -> BTreeSet<Principal> {
        self.bindings
            .iter()
            .flat_map(|b| b.members.iter())
            .filter_map(|m| Principal::from_member(m))
            .collect()
    }
}
