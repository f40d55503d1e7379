//! Consistency audits.
//!
//! Two read-only checks: the registry against the services root
//! ([`ConsistencyAuditor::audit_filesystem`]) and the registry's intent
//! against what the runtime reports ([`ConsistencyAuditor::audit_runtime`]).
//! Per-service failures become entries in the result; an audit as a whole
//! does not fail.

mod filesystem;
mod runtime;
mod types;

pub use types::*;

use crate::compose::DefinitionParser;
use crate::layout::ServicesLayout;
use crate::reconcile::{RealStatus, StatusReconciler};
use crate::state::ServiceRecord;
use std::sync::Arc;

#[derive(Clone)]
pub struct ConsistencyAuditor {
    layout: ServicesLayout,
    parser: Arc<dyn DefinitionParser>,
    reconciler: StatusReconciler,
}

impl ConsistencyAuditor {
    pub fn new(
        layout: ServicesLayout,
        parser: Arc<dyn DefinitionParser>,
        reconciler: StatusReconciler,
    ) -> Self {
        Self {
            layout,
            parser,
            reconciler,
        }
    }

    pub fn audit_filesystem(&self, records: &[ServiceRecord]) -> FilesystemValidation {
        let result = filesystem::audit(&self.layout, self.parser.as_ref(), records);
        tracing::debug!(
            "Filesystem audit: {} consistent, {} inconsistent, {} orphaned",
            result.summary.consistent_count,
            result.summary.inconsistent_count,
            result.summary.orphaned_count
        );
        result
    }

    pub async fn audit_runtime(&self, records: Vec<ServiceRecord>) -> RuntimeValidation {
        let results = self.reconciler.reconcile_all(records).await;
        let result = audit_runtime_results(&results);
        tracing::debug!(
            "Runtime audit: {} valid, {} invalid",
            result.summary.valid_count,
            result.summary.invalid_count
        );
        result
    }
}

/// Runtime audit over statuses that were already reconciled.
pub fn audit_runtime_results(results: &[(ServiceRecord, RealStatus)]) -> RuntimeValidation {
    runtime::audit(results)
}

#[cfg(test)]
mod tests {
    use super::runtime::assess;
    use super::*;
    use crate::reconcile::{RealStatus, StatusKind};
    use chrono::Utc;
    use std::path::PathBuf;

    fn record(name: &str, enabled: bool) -> ServiceRecord {
        ServiceRecord {
            id: 1,
            name: name.into(),
            path: PathBuf::from("/srv").join(name),
            enabled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn status(kind: StatusKind, running: usize, total: usize) -> RealStatus {
        RealStatus {
            status: kind,
            containers: Vec::new(),
            running_count: running,
            total_count: total,
            error: None,
        }
    }

    #[test]
    fn enabled_stopped_needs_start() {
        let (errors, fix) = assess(&record("a", true), &status(StatusKind::Stopped, 0, 2));
        assert_eq!(errors, vec!["enabled but stopped"]);
        assert_eq!(fix, FixAction::Start);
    }

    #[test]
    fn disabled_running_needs_stop() {
        let (errors, fix) = assess(&record("a", false), &status(StatusKind::Running, 2, 2));
        assert_eq!(errors.len(), 1);
        assert_eq!(fix, FixAction::Stop);
    }

    #[test]
    fn disabled_partial_needs_stop() {
        let (_, fix) = assess(
            &record("a", false),
            &status(StatusKind::PartiallyRunning, 1, 2),
        );
        assert_eq!(fix, FixAction::Stop);
    }

    #[test]
    fn enabled_partial_needs_start() {
        let (errors, fix) = assess(
            &record("a", true),
            &status(StatusKind::PartiallyRunning, 1, 3),
        );
        assert!(errors[0].contains("1/3"));
        assert_eq!(fix, FixAction::Start);
    }

    #[test]
    fn matching_intent_is_valid() {
        assert!(assess(&record("a", true), &status(StatusKind::Running, 1, 1)).0.is_empty());
        assert!(assess(&record("a", false), &status(StatusKind::Stopped, 0, 1)).0.is_empty());
        assert!(assess(&record("a", false), &status(StatusKind::NotFound, 0, 0)).0.is_empty());
    }

    #[test]
    fn inspection_failures_are_invalid_regardless_of_intent() {
        for enabled in [true, false] {
            let (errors, fix) = assess(&record("a", enabled), &RealStatus::error("boom"));
            assert!(errors[0].contains("boom"));
            assert_eq!(fix, FixAction::Skip);
            let (errors, _) = assess(&record("a", enabled), &RealStatus::unknown("slow"));
            assert_eq!(errors.len(), 1);
        }
    }

    #[test]
    fn runtime_summary_counts() {
        let results = vec![
            (record("a", true), status(StatusKind::Running, 1, 1)),
            (record("b", true), status(StatusKind::Stopped, 0, 1)),
            (record("c", false), status(StatusKind::Stopped, 0, 1)),
        ];
        let v = runtime::audit(&results);
        assert_eq!(v.total, 3);
        assert_eq!(v.summary.valid_count + v.summary.invalid_count, v.total);
        assert_eq!(v.summary.enabled_healthy_count, 1);
        assert_eq!(v.summary.validation_percentage, 67);
        assert_eq!(v.suggested_fixes.len(), 1);
        assert_eq!(v.suggested_fixes[0].target, "b");
    }

    #[test]
    fn empty_runtime_audit_is_fully_valid() {
        let v = runtime::audit(&[]);
        assert_eq!(v.total, 0);
        assert_eq!(v.summary.validation_percentage, 100);
    }
}
