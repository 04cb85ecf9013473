use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "cloud-sentinel",
    about = "Keep a GCP project's APIs, IAM bindings and key secrets in the shape dependent agents expect",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Target GCP project id. Overrides `project_id` in the config file.
    #[arg(long, env = "SENTINEL_PROJECT", global = true)]
    pub project: Option<String>,

    /// Secret Manager location. Overrides `location` in the config file.
    #[arg(long, env = "SENTINEL_LOCATION", global = true)]
    pub location: Option<String>,

    /// YAML config file with the required APIs and critical roles.
    #[arg(long, env = "SENTINEL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Run against an in-memory cloud instead of GCP.
    #[arg(long, global = true)]
    pub local: bool,

    /// Log line format (logs go to stderr).
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a full reconciliation pass and print the report.
    Check {
        /// Report format.
        #[arg(long, default_value = "text")]
        output: ReportOutput,
    },

    /// Make sure one API is enabled.
    EnableApi {
        /// Service name, e.g. `iam.googleapis.com`.
        name: String,
    },

    /// Make sure a service account holds a role on the project.
    GrantRole {
        /// Service-account email (optionally prefixed with `serviceAccount:`).
        principal: String,
        /// Role, e.g. `roles/logging.logWriter`.
        role: String,
    },

    /// Store a key file as a new secret version for a service account.
    StoreKey {
        /// Service-account email the key belongs to.
        principal: String,
        /// Path to the key material.
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ReportOutput {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
