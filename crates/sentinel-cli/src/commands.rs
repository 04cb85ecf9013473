use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use sentinel_config::{load_config, Overrides};
use sentinel_domain::{ApiName, Principal, Role};
use sentinel_driver::LocalCloud;
use sentinel_reconciler::CloudSentinel;
use tracing::info;

use crate::cli::{GlobalArgs, ReportOutput};
use crate::output;

// ── Setup ─────────────────────────────────────────────────────────────────────

/// Resolve config and construct the sentinel for either GCP or the local cloud.
pub async fn build_sentinel(global: GlobalArgs) -> Result<CloudSentinel> {
    let config = load_config(
        global.config.as_deref(),
        Overrides { project_id: global.project, location: global.location },
    )
    .context("Failed to load sentinel config")?;

    if global.local {
        info!(project = %config.project_id, "Using in-memory cloud");
        return Ok(CloudSentinel::new(config, Arc::new(LocalCloud::new())));
    }

    info!(project = %config.project_id, "Initialising GCP client (ADC)");
    CloudSentinel::from_adc(config)
        .await
        .context("Failed to initialise GCP client")
}

// ── Check ─────────────────────────────────────────────────────────────────────

pub async fn check(sentinel: &CloudSentinel, output_format: ReportOutput) -> Result<ExitCode> {
    let report = sentinel.ensure_environment().await;
    match output_format {
        ReportOutput::Text => print!("{}", output::render_report(&report)),
        ReportOutput::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(ExitCode::from(output::exit_code(report.overall_status)))
}

// ── Single-resource operations ────────────────────────────────────────────────

pub async fn enable_api(sentinel: &CloudSentinel, name: &str) -> Result<ExitCode> {
    let api = ApiName::parse(name)?;
    let ok = sentinel.ensure_api(&api).await;
    println!("{}: {}", api, if ok { "enabled" } else { "FAILED" });
    Ok(status(ok))
}

pub async fn grant_role(sentinel: &CloudSentinel, principal: &str, role: &str) -> Result<ExitCode> {
    let principal = Principal::parse(principal)?;
    let role = Role::parse(role)?;
    let ok = sentinel.ensure_role(&principal, &role).await;
    println!("{} {}: {}", principal, role, if ok { "assigned" } else { "FAILED" });
    Ok(status(ok))
}

pub async fn store_key(sentinel: &CloudSentinel, principal: &str, file: PathBuf) -> Result<ExitCode> {
    let principal = Principal::parse(principal)?;
    let payload = std::fs::read(&file)
        .with_context(|| format!("Failed to read key file {}", file.display()))?;
    let ok = sentinel.store_key_in_secret_manager(&principal, &payload).await;
    println!(
        "{}: {}",
        sentinel_reconciler::secret_id_for(&principal),
        if ok { "stored" } else { "FAILED" }
    );
    Ok(status(ok))
}

fn status(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
