use crate::output::{print_json, UserOutput};
use stackhub::audit::SuggestedFix;
use stackhub::Engine;

fn print_fixes(fixes: &[SuggestedFix], out: &dyn UserOutput) {
    if fixes.is_empty() {
        return;
    }
    out.blank();
    out.status("Suggested fixes:");
    for fix in fixes {
        out.status(&format!("  {:<16} {:<30} {}", fix.action, fix.target, fix.reason));
    }
    out.status("Apply them with `stackhub fix <all|data|state> --execute`.");
}

pub async fn run_validate_data(
    engine: &Engine,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let result = engine.validate_data().await?;
    if json {
        return print_json(out, &result);
    }

    let s = &result.summary;
    out.status(&format!(
        "Filesystem consistency: {}% ({} consistent, {} inconsistent, {} orphaned of {})",
        s.consistency_percentage,
        s.consistent_count,
        s.inconsistent_count,
        s.orphaned_count,
        result.total
    ));

    if !result.inconsistent.is_empty() {
        out.blank();
        out.status("Inconsistent services:");
        for entry in &result.inconsistent {
            out.warning(&format!("  {:<30} {}", entry.service, entry.issue));
        }
    }
    if !result.orphaned_folders.is_empty() {
        out.blank();
        out.status("Unregistered folders:");
        for entry in &result.orphaned_folders {
            out.warning(&format!("  {:<30} {}", entry.folder, entry.issue));
        }
    }

    if result.is_clean() {
        out.success("Registry and services root agree");
    }
    print_fixes(&result.suggested_fixes, out);
    Ok(())
}

pub async fn run_validate_services(
    engine: &Engine,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let result = engine.validate_services().await?;
    if json {
        return print_json(out, &result);
    }

    let s = &result.summary;
    out.status(&format!(
        "Runtime state: {}% valid ({} valid, {} invalid, {} enabled and running)",
        s.validation_percentage, s.valid_count, s.invalid_count, s.enabled_healthy_count
    ));

    if !result.invalid.is_empty() {
        out.blank();
        out.status("Services needing attention:");
        for entry in &result.invalid {
            out.warning(&format!(
                "  {:<30} {:<18} {}",
                entry.service,
                entry.status,
                entry.validation_errors.join("; ")
            ));
        }
    }

    if result.is_clean() {
        out.success("Every service matches its enabled flag");
    }
    print_fixes(&result.suggested_fixes, out);
    Ok(())
}
