//! The engine: every registry operation behind one facade.
//!
//! Operations are request-scoped. Reads (list, get, audits) run without
//! locks and tolerate overlapping calls; mutations of one service hold that
//! service's lock for their whole duration.

mod builder;
mod views;

pub use builder::EngineBuilder;
pub use views::{HealthReport, HealthState, LogsView, ServiceView};

use crate::archive::{extract_archive, ArchiveLimits};
use crate::audit::{ConsistencyAuditor, FilesystemValidation, RuntimeValidation};
use crate::compose::DefinitionParser;
use crate::docker::{ContainerRuntime, ExecOutput, ExecRequest};
use crate::error::{Error, Result};
use crate::layout::{locate_definition, validate_service_name, DefinitionLookup, ServicesLayout};
use crate::lifecycle::{self, LifecycleAction};
use crate::locks::ServiceLocks;
use crate::reconcile::{project_for, RealStatus, StatusKind, StatusReconciler};
use crate::repair::{self, ActionReport, FixKind, FixReport, RepairExecutor};
use crate::state::{InsertOutcome, NewServiceRecord, RecordStore, ServiceRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Behavioural switches that do not affect wiring.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub enable_new_services: bool,
    pub default_log_tail: usize,
    pub archive_limits: ArchiveLimits,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            enable_new_services: false,
            default_log_tail: 100,
            archive_limits: ArchiveLimits::default(),
        }
    }
}

pub struct Engine {
    store: Arc<RecordStore>,
    layout: ServicesLayout,
    parser: Arc<dyn DefinitionParser>,
    runtime: Arc<dyn ContainerRuntime>,
    locks: ServiceLocks,
    reconciler: StatusReconciler,
    auditor: ConsistencyAuditor,
    repair: RepairExecutor,
    options: EngineOptions,
}

impl Engine {
    pub fn layout(&self) -> &ServicesLayout {
        &self.layout
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    async fn require(&self, name: &str) -> Result<ServiceRecord> {
        self.store
            .get(name)
            .await?
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Every record with its current status, ordered by name.
    pub async fn list(&self) -> Result<Vec<ServiceView>> {
        let records = self.store.list().await?;
        Ok(self
            .reconciler
            .reconcile_all(records)
            .await
            .into_iter()
            .map(|(record, real_status)| ServiceView {
                record,
                real_status,
                yaml_content: None,
            })
            .collect())
    }

    /// One record with its status and definition text.
    pub async fn get(&self, name: &str) -> Result<ServiceView> {
        let record = self.require(name).await?;
        let real_status = self.reconciler.reconcile(&record).await;
        let yaml_content = match locate_definition(&record.path) {
            DefinitionLookup::Found { text, .. } => Some(text),
            _ => None,
        };
        Ok(ServiceView {
            record,
            real_status,
            yaml_content,
        })
    }

    /// Current status of one service.
    pub async fn status(&self, name: &str) -> Result<RealStatus> {
        let record = self.require(name).await?;
        Ok(self.reconciler.reconcile(&record).await)
    }

    /// Recent log output. Runtime failures yield placeholder text, not an error.
    pub async fn logs(&self, name: &str, tail: Option<usize>) -> Result<LogsView> {
        let record = self.require(name).await?;
        let tail = tail.unwrap_or(self.options.default_log_tail);

        let unavailable = |reason: String| LogsView {
            service: record.name.clone(),
            logs: format!("Logs unavailable: {}", reason),
            available: false,
        };

        let project = match project_for(&record) {
            Ok(project) => project,
            Err(e) => return Ok(unavailable(e.to_string())),
        };
        match self.runtime.logs(&project, tail).await {
            Ok(logs) => Ok(LogsView {
                service: record.name.clone(),
                logs,
                available: true,
            }),
            Err(e) => {
                warn!("Could not fetch logs for '{}': {}", record.name, e);
                Ok(unavailable(e.to_string()))
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn start(&self, name: &str) -> Result<()> {
        self.lifecycle(name, LifecycleAction::Start).await
    }

    pub async fn stop(&self, name: &str) -> Result<()> {
        self.lifecycle(name, LifecycleAction::Stop).await
    }

    pub async fn restart(&self, name: &str) -> Result<()> {
        self.lifecycle(name, LifecycleAction::Restart).await
    }

    async fn lifecycle(&self, name: &str, action: LifecycleAction) -> Result<()> {
        let _guard = self.locks.acquire(name).await;
        let record = self.require(name).await?;
        lifecycle::perform(self.runtime.as_ref(), &record, action).await
    }

    /// Record the desired state. Does not start or stop anything.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<ServiceRecord> {
        let _guard = self.locks.acquire(name).await;
        self.store.set_enabled(name, enabled).await
    }

    /// Run a command inside one of the service's containers.
    pub async fn exec(&self, name: &str, request: &ExecRequest) -> Result<ExecOutput> {
        if request.command.trim().is_empty() {
            return Err(Error::InvalidRequest("command must not be empty".to_string()));
        }
        let record = self.require(name).await?;
        let (project, declared) = match locate_definition(&record.path) {
            DefinitionLookup::Found { file, text } => {
                let definition = self.parser.parse(&text)?;
                (
                    crate::docker::ComposeProject::new(&record.name, file),
                    definition.declares(&request.container),
                )
            }
            other => {
                return Err(Error::Unmanageable {
                    name: record.name.clone(),
                    reason: other.problem().unwrap_or_default(),
                })
            }
        };
        if !declared {
            return Err(Error::InvalidRequest(format!(
                "service '{}' has no container '{}'",
                record.name, request.container
            )));
        }
        self.runtime
            .exec(&project, request)
            .await
            .map_err(|e| Error::from_runtime_action(&record.name, "exec", e))
    }

    // ========================================================================
    // Create / delete
    // ========================================================================

    /// Register a new service from definition text.
    pub async fn create_from_definition(&self, name: &str, yaml: &str) -> Result<ServiceRecord> {
        validate_service_name(name)?;
        let _guard = self.locks.acquire(name).await;

        self.ensure_unregistered(name).await?;
        self.parser.parse_valid(yaml)?;

        let dir = self.layout.materialize(name, yaml)?;
        self.register(name, dir).await
    }

    /// Register a new service from a ZIP archive holding its definition.
    pub async fn create_from_archive(&self, name: &str, bytes: Vec<u8>) -> Result<ServiceRecord> {
        validate_service_name(name)?;
        let _guard = self.locks.acquire(name).await;

        self.ensure_unregistered(name).await?;
        let target = self.layout.service_dir(name);
        if target.exists() {
            return Err(Error::FolderConflict {
                name: name.to_string(),
                path: target.display().to_string(),
            });
        }

        self.layout.ensure_root()?;
        let staging = self.layout.staging_dir(name);
        self.layout.discard(&staging);

        let dir = match self.stage_archive(bytes, &staging).await {
            Ok(()) => match self.layout.install(&staging, name) {
                Ok(dir) => dir,
                Err(e) => {
                    self.layout.discard(&staging);
                    return Err(e);
                }
            },
            Err(e) => {
                self.layout.discard(&staging);
                return Err(e);
            }
        };
        self.register(name, dir).await
    }

    async fn stage_archive(&self, bytes: Vec<u8>, staging: &Path) -> Result<()> {
        let limits = self.options.archive_limits;
        let dest = staging.to_path_buf();
        tokio::task::spawn_blocking(move || extract_archive(&bytes, &dest, &limits))
            .await
            .map_err(|e| Error::Filesystem(format!("archive extraction task failed: {}", e)))??;

        match locate_definition(staging) {
            DefinitionLookup::Found { text, .. } => {
                self.parser.parse_valid(&text)?;
                Ok(())
            }
            DefinitionLookup::MissingFile => Err(Error::InvalidArchive(format!(
                "archive contains no definition file (expected one of {})",
                crate::layout::DEFINITION_FILE_NAMES.join(", ")
            ))),
            other => Err(Error::InvalidArchive(other.problem().unwrap_or_default())),
        }
    }

    async fn ensure_unregistered(&self, name: &str) -> Result<()> {
        if self.store.get(name).await?.is_some() {
            return Err(Error::NameConflict(name.to_string()));
        }
        Ok(())
    }

    /// Insert the record for a freshly materialized directory, removing the
    /// directory again if that fails.
    async fn register(&self, name: &str, dir: PathBuf) -> Result<ServiceRecord> {
        let inserted = self
            .store
            .insert(NewServiceRecord {
                name: name.to_string(),
                path: dir.clone(),
                enabled: self.options.enable_new_services,
            })
            .await;
        match inserted {
            Ok(InsertOutcome::Inserted(record)) => Ok(record),
            Ok(InsertOutcome::AlreadyExists) => {
                self.layout.discard(&dir);
                Err(Error::NameConflict(name.to_string()))
            }
            Err(e) => {
                self.layout.discard(&dir);
                Err(e)
            }
        }
    }

    /// Remove a service: containers (with `force`), directory, then record.
    ///
    /// Without `force` a service with any running container is refused, as
    /// is one whose state cannot be determined.
    pub async fn delete(&self, name: &str, force: bool) -> Result<()> {
        let _guard = self.locks.acquire(name).await;
        let record = self.require(name).await?;

        if force {
            if let Ok(project) = project_for(&record) {
                if let Err(e) = self.runtime.down(&project).await {
                    warn!("Ignoring failed teardown of '{}': {}", name, e);
                }
            }
        } else {
            let status = self.reconciler.reconcile(&record).await;
            match status.status {
                kind if kind.has_running() => {
                    return Err(Error::ServiceRunning {
                        name: name.to_string(),
                        running: status.running_count,
                        total: status.total_count,
                    })
                }
                StatusKind::Error | StatusKind::Unknown => {
                    return Err(Error::RuntimeUnavailable(format!(
                        "cannot confirm '{}' is stopped ({}); delete with force to proceed",
                        name,
                        status.error.unwrap_or_default()
                    )))
                }
                _ => {}
            }
        }

        if record.path.starts_with(self.layout.root()) {
            self.layout.remove(&record.path)?;
        } else {
            warn!(
                "Leaving {} in place: it is outside the services root",
                record.path.display()
            );
        }

        self.store.delete(name).await?;
        info!("Deleted service '{}'", name);
        Ok(())
    }

    // ========================================================================
    // Audits and repair
    // ========================================================================

    pub async fn validate_data(&self) -> Result<FilesystemValidation> {
        let records = self.store.list().await?;
        Ok(self.auditor.audit_filesystem(&records))
    }

    pub async fn validate_services(&self) -> Result<RuntimeValidation> {
        let records = self.store.list().await?;
        Ok(self.auditor.audit_runtime(records).await)
    }

    /// Plan corrective actions for `kind`, executing them when `auto_execute`.
    pub async fn fix(&self, kind: FixKind, auto_execute: bool) -> Result<FixReport> {
        let filesystem = if kind.includes_filesystem() {
            Some(self.validate_data().await?)
        } else {
            None
        };
        let runtime = if kind.includes_state() {
            Some(self.validate_services().await?)
        } else {
            None
        };

        let fixes = repair::plan(filesystem.as_ref(), runtime.as_ref());
        info!(
            "Repair ({}): {} action(s) planned{}",
            kind,
            fixes.len(),
            if auto_execute { ", executing" } else { "" }
        );

        let actions = if auto_execute {
            self.repair.execute(fixes).await
        } else {
            fixes.into_iter().map(ActionReport::planned).collect()
        };
        Ok(FixReport::new(kind, auto_execute, actions))
    }

    // ========================================================================
    // Health
    // ========================================================================

    pub async fn health(&self) -> Result<HealthReport> {
        let runtime_available = self.runtime.ping().await;
        let services = self.store.list().await?.len();
        Ok(HealthReport {
            status: if runtime_available {
                HealthState::Healthy
            } else {
                HealthState::Degraded
            },
            runtime_available,
            services,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
