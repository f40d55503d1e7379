use crate::output::{print_json, UserOutput};
use stackhub::engine::{HealthState, ServiceView};
use stackhub::{Engine, StatusKind};

fn status_icon(kind: StatusKind) -> &'static str {
    match kind {
        StatusKind::Running => "+",
        StatusKind::PartiallyRunning => "~",
        StatusKind::Stopped => "o",
        StatusKind::NotFound => "?",
        StatusKind::Unknown => ".",
        StatusKind::Error => "x",
    }
}

fn summary_line(view: &ServiceView) -> String {
    let status = &view.real_status;
    format!(
        "  {} {:<30} {:<18} {}/{} {}",
        status_icon(status.status),
        view.record.name,
        status.status,
        status.running_count,
        status.total_count,
        if view.record.enabled { "enabled" } else { "disabled" }
    )
}

pub async fn run_list(engine: &Engine, json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let views = engine.list().await?;
    if json {
        return print_json(out, &views);
    }

    out.status("Services:");
    out.status(&format!("{:-<70}", ""));
    if views.is_empty() {
        out.status("  No services registered");
        return Ok(());
    }
    for view in &views {
        out.status(&summary_line(view));
        if let Some(err) = &view.real_status.error {
            out.warning(&format!("      {}", err));
        }
    }
    Ok(())
}

pub async fn run_get(
    engine: &Engine,
    name: &str,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let view = engine.get(name).await?;
    if json {
        return print_json(out, &view);
    }

    let record = &view.record;
    let status = &view.real_status;
    out.status(&format!("Service:  {}", record.name));
    out.status(&format!("Path:     {}", record.path.display()));
    out.status(&format!("Enabled:  {}", record.enabled));
    out.status(&format!(
        "Status:   {} ({}/{} running)",
        status.status, status.running_count, status.total_count
    ));
    if let Some(err) = &status.error {
        out.warning(&format!("          {}", err));
    }
    out.status(&format!("Created:  {}", record.created_at.to_rfc3339()));
    out.status(&format!("Updated:  {}", record.updated_at.to_rfc3339()));

    if !status.containers.is_empty() {
        out.blank();
        out.status("Containers:");
        for c in &status.containers {
            out.status(&format!(
                "  {:<30} {:<10} {}",
                c.name,
                c.state,
                c.health.as_deref().unwrap_or(&c.status)
            ));
        }
    }

    if let Some(yaml) = &view.yaml_content {
        out.blank();
        out.status("Definition:");
        out.raw(yaml);
    }
    Ok(())
}

pub async fn run_health(engine: &Engine, json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let report = engine.health().await?;
    if json {
        return print_json(out, &report);
    }

    let line = format!(
        "stackhub {}: {} ({} services, runtime {})",
        report.version,
        match report.status {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
        },
        report.services,
        if report.runtime_available {
            "reachable"
        } else {
            "unreachable"
        }
    );
    match report.status {
        HealthState::Healthy => out.success(&line),
        HealthState::Degraded => out.warning(&line),
    }
    Ok(())
}
