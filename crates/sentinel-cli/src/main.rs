mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, LogFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match cli.global.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    let sentinel = commands::build_sentinel(cli.global).await?;

    match cli.command {
        Command::Check { output } => commands::check(&sentinel, output).await,
        Command::EnableApi { name } => commands::enable_api(&sentinel, &name).await,
        Command::GrantRole { principal, role } => {
            commands::grant_role(&sentinel, &principal, &role).await
        }
        Command::StoreKey { principal, file } => {
            commands::store_key(&sentinel, &principal, file).await
        }
    }
}
