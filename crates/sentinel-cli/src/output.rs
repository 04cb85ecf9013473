use sentinel_reconciler::{EnvironmentReport, OverallStatus};

/// Render a report as human-readable text.
pub fn render_report(report: &EnvironmentReport) -> String {
    let mut out = format!(
        "Project {} ({})\nStatus: {}\n",
        report.project_id,
        report.timestamp.to_rfc3339(),
        report.overall_status
    );
    if let Some(err) = &report.error {
        out.push_str(&format!("Error: {}\n", err));
    }

    out.push_str(&format!(
        "\nAPIs: {} enabled, {} failed\n",
        report.apis_enabled.len(),
        report.apis_failed.len()
    ));
    for api in &report.apis_enabled {
        out.push_str(&format!("  + {}\n", api));
    }
    for api in &report.apis_failed {
        out.push_str(&format!("  ! {}\n", api));
    }

    out.push_str(&format!(
        "\nPermissions: {} valid, {} missing\n",
        report.permissions_valid.len(),
        report.permissions_missing.len()
    ));
    for missing in &report.permissions_missing {
        out.push_str(&format!("  ! {}\n", missing));
    }

    out.push_str(&format!(
        "\nKeys: {} rotated, {} failed\n",
        report.keys_rotated.len(),
        report.keys_failed.len()
    ));
    for failed in &report.keys_failed {
        out.push_str(&format!("  ! {}\n", failed));
    }
    out
}

/// Process exit code for a finished check.
pub fn exit_code(status: OverallStatus) -> u8 {
    match status {
        OverallStatus::Healthy => 0,
        OverallStatus::IssuesFound => 1,
        OverallStatus::Error => 2,
    }
}
