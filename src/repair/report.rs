use super::FixKind;
use crate::audit::{FixAction, SuggestedFix};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Not executed (plan only).
    Planned,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub action: FixAction,
    pub target: String,
    pub reason: String,
    pub outcome: ActionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ActionReport {
    pub fn planned(fix: SuggestedFix) -> Self {
        Self {
            action: fix.action,
            target: fix.target,
            reason: fix.reason,
            outcome: ActionOutcome::Planned,
            detail: None,
        }
    }

    pub fn finished(fix: SuggestedFix, outcome: ActionOutcome, detail: impl Into<String>) -> Self {
        Self {
            action: fix.action,
            target: fix.target,
            reason: fix.reason,
            outcome,
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSummary {
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixReport {
    pub kind: FixKind,
    pub executed: bool,
    pub actions: Vec<ActionReport>,
    pub summary: FixSummary,
}

impl FixReport {
    pub fn new(kind: FixKind, executed: bool, actions: Vec<ActionReport>) -> Self {
        let mut summary = FixSummary {
            planned: actions.len(),
            ..FixSummary::default()
        };
        for action in &actions {
            match action.outcome {
                ActionOutcome::Succeeded => summary.succeeded += 1,
                ActionOutcome::Failed => summary.failed += 1,
                ActionOutcome::Skipped => summary.skipped += 1,
                ActionOutcome::Planned => {}
            }
        }
        Self {
            kind,
            executed,
            actions,
            summary,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}
