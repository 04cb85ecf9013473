use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid api name: {0}")]
    InvalidApiName(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),
}
