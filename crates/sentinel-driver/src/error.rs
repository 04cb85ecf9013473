use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The provider rejected a write made against a stale etag.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("internal driver error: {0}")]
    Internal(String),
}
