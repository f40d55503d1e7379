//! Drift repair.
//!
//! A repair run turns audit findings into actions. Planning never mutates
//! anything; execution applies each action independently under the
//! affected service's lock and records what happened, so one failure never
//! stops the rest.

mod kind;
mod report;

pub use kind::FixKind;
pub use report::{ActionOutcome, ActionReport, FixReport, FixSummary};

use crate::audit::{FilesystemValidation, FixAction, RuntimeValidation, SuggestedFix};
use crate::compose::DefinitionParser;
use crate::docker::ContainerRuntime;
use crate::error::{Error, Result};
use crate::layout::{locate_definition, validate_service_name, DefinitionLookup, ServicesLayout};
use crate::lifecycle::{self, LifecycleAction};
use crate::locks::ServiceLocks;
use crate::state::{InsertOutcome, NewServiceRecord, RecordStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Merge audit findings into one ordered plan: filesystem actions first,
/// then runtime actions. Runtime actions for records about to be removed
/// are dropped.
pub fn plan(
    filesystem: Option<&FilesystemValidation>,
    runtime: Option<&RuntimeValidation>,
) -> Vec<SuggestedFix> {
    let mut fixes: Vec<SuggestedFix> = filesystem
        .map(|v| v.suggested_fixes.clone())
        .unwrap_or_default();

    let removed: HashSet<String> = fixes
        .iter()
        .filter(|f| f.action == FixAction::RemoveRecord)
        .map(|f| f.target.clone())
        .collect();

    if let Some(runtime) = runtime {
        fixes.extend(
            runtime
                .suggested_fixes
                .iter()
                .filter(|f| !removed.contains(&f.target))
                .cloned(),
        );
    }
    fixes
}

/// Applies planned fixes.
pub struct RepairExecutor {
    store: Arc<RecordStore>,
    layout: ServicesLayout,
    parser: Arc<dyn DefinitionParser>,
    runtime: Arc<dyn ContainerRuntime>,
    locks: ServiceLocks,
    enable_new_services: bool,
}

impl RepairExecutor {
    pub fn new(
        store: Arc<RecordStore>,
        layout: ServicesLayout,
        parser: Arc<dyn DefinitionParser>,
        runtime: Arc<dyn ContainerRuntime>,
        locks: ServiceLocks,
        enable_new_services: bool,
    ) -> Self {
        Self {
            store,
            layout,
            parser,
            runtime,
            locks,
            enable_new_services,
        }
    }

    /// Execute every fix, best effort.
    pub async fn execute(&self, fixes: Vec<SuggestedFix>) -> Vec<ActionReport> {
        let mut reports = Vec::with_capacity(fixes.len());
        for fix in fixes {
            let report = match self.apply(&fix).await {
                Ok(Applied::Done(detail)) => {
                    info!("Repair {} '{}': {}", fix.action, fix.target, detail);
                    ActionReport::finished(fix, ActionOutcome::Succeeded, detail)
                }
                Ok(Applied::Skipped(detail)) => {
                    ActionReport::finished(fix, ActionOutcome::Skipped, detail)
                }
                Err(e) => {
                    warn!("Repair {} '{}' failed: {}", fix.action, fix.target, e);
                    ActionReport::finished(fix, ActionOutcome::Failed, e.to_string())
                }
            };
            reports.push(report);
        }
        reports
    }

    async fn apply(&self, fix: &SuggestedFix) -> Result<Applied> {
        match fix.action {
            FixAction::Skip => Ok(Applied::Skipped(fix.reason.clone())),
            FixAction::RegisterOrphan => self.register_orphan(&fix.target).await,
            FixAction::RemoveRecord => self.remove_record(&fix.target).await,
            FixAction::Start => self.lifecycle(&fix.target, LifecycleAction::Start).await,
            FixAction::Stop => self.lifecycle(&fix.target, LifecycleAction::Stop).await,
        }
    }

    async fn register_orphan(&self, folder: &str) -> Result<Applied> {
        let _guard = self.locks.acquire(folder).await;

        if let Err(e) = validate_service_name(folder) {
            return Ok(Applied::Skipped(e.to_string()));
        }
        let path = self.layout.service_dir(folder);
        let text = match locate_definition(&path) {
            DefinitionLookup::Found { text, .. } => text,
            other => return Ok(Applied::Skipped(other.problem().unwrap_or_default())),
        };
        if let Err(e) = self.parser.parse_valid(&text) {
            return Ok(Applied::Skipped(e.to_string()));
        }

        let outcome = self
            .store
            .insert(NewServiceRecord {
                name: folder.to_string(),
                path: path.clone(),
                enabled: self.enable_new_services,
            })
            .await?;
        match outcome {
            InsertOutcome::Inserted(_) => Ok(Applied::Done(format!(
                "registered {}",
                path.display()
            ))),
            InsertOutcome::AlreadyExists => {
                Ok(Applied::Skipped("already registered".to_string()))
            }
        }
    }

    async fn remove_record(&self, name: &str) -> Result<Applied> {
        let _guard = self.locks.acquire(name).await;

        let Some(record) = self.store.get(name).await? else {
            return Ok(Applied::Skipped("record already removed".to_string()));
        };
        if record.path.exists() {
            return Ok(Applied::Skipped(format!(
                "{} exists again; record kept",
                record.path.display()
            )));
        }
        self.store.delete(name).await?;
        Ok(Applied::Done("record removed".to_string()))
    }

    async fn lifecycle(&self, name: &str, action: LifecycleAction) -> Result<Applied> {
        let _guard = self.locks.acquire(name).await;

        let record = self
            .store
            .get(name)
            .await?
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))?;
        lifecycle::perform(self.runtime.as_ref(), &record, action).await?;
        Ok(Applied::Done(format!("{} issued", action)))
    }
}

enum Applied {
    Done(String),
    Skipped(String),
}
