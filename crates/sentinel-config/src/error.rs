use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing project id: set `project_id` in the config file or pass --project")]
    MissingProject,

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("domain error: {0}")]
    Domain(#[from] sentinel_domain::DomainError),
}
