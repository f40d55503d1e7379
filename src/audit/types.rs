use crate::reconcile::StatusKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Corrective action a repair run can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    /// Create a record for an unregistered folder.
    RegisterOrphan,
    /// Delete a record whose directory is gone.
    RemoveRecord,
    Start,
    Stop,
    /// Drift that needs a human; reported, never executed.
    Skip,
}

impl fmt::Display for FixAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FixAction::RegisterOrphan => "register_orphan",
            FixAction::RemoveRecord => "remove_record",
            FixAction::Start => "start",
            FixAction::Stop => "stop",
            FixAction::Skip => "skip",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub action: FixAction,
    /// Service name or orphaned folder name.
    pub target: String,
    pub reason: String,
}

impl SuggestedFix {
    pub fn new(action: FixAction, target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action,
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// `round(part / total * 100)`, or 100 when there is nothing to check.
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

// ============================================================================
// Filesystem audit
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistentService {
    pub service: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InconsistentService {
    pub service: String,
    pub path: PathBuf,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedFolder {
    pub folder: String,
    pub path: PathBuf,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemSummary {
    pub consistent_count: usize,
    pub inconsistent_count: usize,
    pub orphaned_count: usize,
    pub consistency_percentage: u32,
}

/// Registry compared against the services root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemValidation {
    /// Records plus orphaned folders.
    pub total: usize,
    pub summary: FilesystemSummary,
    pub consistent: Vec<ConsistentService>,
    pub inconsistent: Vec<InconsistentService>,
    pub orphaned_folders: Vec<OrphanedFolder>,
    pub suggested_fixes: Vec<SuggestedFix>,
}

impl FilesystemValidation {
    pub fn is_clean(&self) -> bool {
        self.inconsistent.is_empty() && self.orphaned_folders.is_empty()
    }
}

// ============================================================================
// Runtime audit
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidService {
    pub service: String,
    pub enabled: bool,
    pub status: StatusKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidService {
    pub service: String,
    pub enabled: bool,
    pub status: StatusKind,
    pub validation_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSummary {
    pub valid_count: usize,
    pub invalid_count: usize,
    /// Enabled services that are fully running.
    pub enabled_healthy_count: usize,
    pub validation_percentage: u32,
}

/// Registry intent compared against observed runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeValidation {
    pub total: usize,
    pub summary: RuntimeSummary,
    pub valid: Vec<ValidService>,
    pub invalid: Vec<InvalidService>,
    pub suggested_fixes: Vec<SuggestedFix>,
}

impl RuntimeValidation {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_and_handles_empty() {
        assert_eq!(percentage(0, 0), 100);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(0, 5), 0);
    }

    #[test]
    fn fix_action_serializes_snake_case() {
        let fix = SuggestedFix::new(FixAction::RegisterOrphan, "web", "unregistered");
        let json = serde_json::to_value(&fix).unwrap();
        assert_eq!(json["action"], "register_orphan");
        assert_eq!(FixAction::RemoveRecord.to_string(), "remove_record");
    }
}
