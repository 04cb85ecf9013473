use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The cloud client could not be constructed at all. Fatal.
    #[error("cloud dependencies unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("driver error: {0}")]
    Driver(#[from] sentinel_driver::DriverError),
}
