pub mod error;
pub mod reconcile;
pub mod report;
pub mod sentinel;

pub use error::ReconcileError;
pub use reconcile::ensure_cloud_environment;
pub use report::{ApiEnablement, EnvironmentReport, KeyRotation, OverallStatus, PermissionCheck};
pub use sentinel::{secret_id_for, CloudSentinel};
