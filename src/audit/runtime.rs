use super::types::{
    percentage, FixAction, InvalidService, RuntimeSummary, RuntimeValidation, SuggestedFix,
    ValidService,
};
use crate::reconcile::{RealStatus, StatusKind};
use crate::state::ServiceRecord;

/// Everything wrong with one service's runtime state, and the fix for it.
pub(crate) fn assess(record: &ServiceRecord, status: &RealStatus) -> (Vec<String>, FixAction) {
    let detail = || status.error.clone().unwrap_or_default();
    match (status.status, record.enabled) {
        (StatusKind::Error, _) => (
            vec![format!("inspection failed: {}", detail())],
            FixAction::Skip,
        ),
        (StatusKind::Unknown, _) => (
            vec![format!("inspection did not complete: {}", detail())],
            FixAction::Skip,
        ),
        (StatusKind::NotFound, true) => (
            vec![format!("enabled but not found: {}", detail())],
            FixAction::Skip,
        ),
        (StatusKind::Stopped, true) => (
            vec!["enabled but stopped".to_string()],
            FixAction::Start,
        ),
        (StatusKind::PartiallyRunning, true) => (
            vec![format!(
                "enabled but only {}/{} containers running",
                status.running_count, status.total_count
            )],
            FixAction::Start,
        ),
        (StatusKind::Running | StatusKind::PartiallyRunning, false) => (
            vec![format!(
                "disabled but running ({}/{} containers up)",
                status.running_count, status.total_count
            )],
            FixAction::Stop,
        ),
        (StatusKind::Running, true) | (StatusKind::Stopped | StatusKind::NotFound, false) => {
            (Vec::new(), FixAction::Skip)
        }
    }
}

pub(super) fn audit(results: &[(ServiceRecord, RealStatus)]) -> RuntimeValidation {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    let mut fixes = Vec::new();
    let mut enabled_healthy_count = 0;

    for (record, status) in results {
        if record.enabled && status.status == StatusKind::Running {
            enabled_healthy_count += 1;
        }
        let (errors, fix) = assess(record, status);
        if errors.is_empty() {
            valid.push(ValidService {
                service: record.name.clone(),
                enabled: record.enabled,
                status: status.status,
            });
        } else {
            fixes.push(SuggestedFix::new(fix, &record.name, errors.join("; ")));
            invalid.push(InvalidService {
                service: record.name.clone(),
                enabled: record.enabled,
                status: status.status,
                validation_errors: errors,
            });
        }
    }

    let total = results.len();
    RuntimeValidation {
        total,
        summary: RuntimeSummary {
            valid_count: valid.len(),
            invalid_count: invalid.len(),
            enabled_healthy_count,
            validation_percentage: percentage(valid.len(), total),
        },
        valid,
        invalid,
        suggested_fixes: fixes,
    }
}
