mod raw;
mod loader;
pub mod error;

pub use loader::{
    load_config, parse_config, Overrides, SentinelConfig, DEFAULT_API_ENABLE_TIMEOUT_SECS,
    DEFAULT_CRITICAL_ROLES, DEFAULT_LOCATION, DEFAULT_REQUIRED_APIS,
};
pub use error::ConfigError;
