use crate::output::{print_json, UserOutput};
use stackhub::repair::ActionOutcome;
use stackhub::{Engine, Error, FixKind};

/// Plan or execute repairs. A report with failed actions is printed, then
/// returned as a `PartialFailure` error so the exit code reflects it.
pub async fn run_fix(
    engine: &Engine,
    kind: &str,
    execute: bool,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let kind: FixKind = kind.parse()?;
    let report = engine.fix(kind, execute).await?;

    if json {
        print_json(out, &report)?;
    } else if report.actions.is_empty() {
        out.success(&format!("Nothing to repair ({})", kind));
    } else {
        out.status(&format!(
            "{} ({}):",
            if execute { "Repair results" } else { "Repair plan" },
            kind
        ));
        for action in &report.actions {
            let line = format!(
                "  {:<16} {:<30} {}",
                action.action,
                action.target,
                action.detail.as_deref().unwrap_or(&action.reason)
            );
            match action.outcome {
                ActionOutcome::Planned => out.status(&line),
                ActionOutcome::Succeeded => out.success(&line),
                ActionOutcome::Skipped => out.warning(&line),
                ActionOutcome::Failed => out.error(&line),
            }
        }

        let s = &report.summary;
        out.blank();
        if execute {
            out.status(&format!(
                "{} planned: {} succeeded, {} failed, {} skipped",
                s.planned, s.succeeded, s.failed, s.skipped
            ));
        } else {
            out.status(&format!(
                "{} action(s) planned. Re-run with --execute to apply them.",
                s.planned
            ));
        }
    }

    if report.has_failures() {
        return Err(Error::PartialFailure {
            failed: report.summary.failed,
            total: report.summary.planned,
        }
        .into());
    }
    Ok(())
}
