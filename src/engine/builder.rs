use super::{Engine, EngineOptions};
use crate::archive::ArchiveLimits;
use crate::audit::ConsistencyAuditor;
use crate::compose::{DefinitionParser, YamlDefinitionParser};
use crate::config::Settings;
use crate::docker::{ComposeRuntime, ContainerRuntime, DockerClient, RuntimeTimeouts};
use crate::error::{Error, Result};
use crate::layout::ServicesLayout;
use crate::locks::ServiceLocks;
use crate::reconcile::{RuntimeInspector, StatusReconciler};
use crate::repair::RepairExecutor;
use crate::state::RecordStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Builder for an [`Engine`].
///
/// A store, a services root and a runtime are required; everything else
/// has a default.
///
/// ```no_run
/// use stackhub::engine::Engine;
/// use stackhub::state::RecordStore;
/// use stackhub::docker::{ComposeRuntime, DockerClient, RuntimeTimeouts};
/// use std::sync::Arc;
///
/// # async fn example() -> stackhub::Result<()> {
/// let store = RecordStore::new("registry.db".into()).await?;
/// store.initialize().await?;
/// let engine = Engine::builder()
///     .store(store)
///     .services_root("/srv/stacks")
///     .runtime(Arc::new(ComposeRuntime::new(DockerClient::new(), RuntimeTimeouts::default())))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct EngineBuilder {
    store: Option<Arc<RecordStore>>,
    services_root: Option<PathBuf>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    parser: Arc<dyn DefinitionParser>,
    inspect_timeout: Duration,
    max_concurrent_inspections: usize,
    options: EngineOptions,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            services_root: None,
            runtime: None,
            parser: Arc::new(YamlDefinitionParser::new()),
            inspect_timeout: RuntimeTimeouts::default().inspect,
            max_concurrent_inspections: 8,
            options: EngineOptions::default(),
        }
    }

    pub fn store(mut self, store: RecordStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn services_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.services_root = Some(root.into());
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn DefinitionParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Per-service inspection deadline; slower services report `unknown`.
    pub fn inspect_timeout(mut self, timeout: Duration) -> Self {
        self.inspect_timeout = timeout;
        self
    }

    pub fn max_concurrent_inspections(mut self, n: usize) -> Self {
        self.max_concurrent_inspections = n.max(1);
        self
    }

    pub fn enable_new_services(mut self, enabled: bool) -> Self {
        self.options.enable_new_services = enabled;
        self
    }

    pub fn default_log_tail(mut self, tail: usize) -> Self {
        self.options.default_log_tail = tail;
        self
    }

    pub fn archive_limits(mut self, limits: ArchiveLimits) -> Self {
        self.options.archive_limits = limits;
        self
    }

    pub fn build(self) -> Result<Engine> {
        let store = self
            .store
            .ok_or_else(|| Error::Config("Engine requires a record store".to_string()))?;
        let root = self
            .services_root
            .ok_or_else(|| Error::Config("Engine requires a services root".to_string()))?;
        let runtime = self
            .runtime
            .ok_or_else(|| Error::Config("Engine requires a container runtime".to_string()))?;

        let layout = ServicesLayout::new(root);
        let locks = ServiceLocks::new();
        let inspector = RuntimeInspector::new(runtime.clone(), self.inspect_timeout);
        let reconciler = StatusReconciler::new(
            inspector,
            self.parser.clone(),
            self.max_concurrent_inspections,
        );
        let auditor =
            ConsistencyAuditor::new(layout.clone(), self.parser.clone(), reconciler.clone());
        let repair = RepairExecutor::new(
            store.clone(),
            layout.clone(),
            self.parser.clone(),
            runtime.clone(),
            locks.clone(),
            self.options.enable_new_services,
        );

        Ok(Engine {
            store,
            layout,
            parser: self.parser,
            runtime,
            locks,
            reconciler,
            auditor,
            repair,
            options: self.options,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Open the registry and wire the docker CLI runtime from settings.
    pub async fn from_settings(settings: &Settings) -> Result<Engine> {
        let store = RecordStore::new(settings.database.clone()).await?;
        store.initialize().await?;

        let client = match settings.runtime.compose_flavour() {
            Some(flavour) => DockerClient::with_compose_command(flavour),
            None => DockerClient::new(),
        };
        let runtime = ComposeRuntime::new(client, settings.runtime.timeouts());

        Engine::builder()
            .store(store)
            .services_root(settings.services_root.clone())
            .runtime(Arc::new(runtime))
            .inspect_timeout(settings.runtime.inspect_timeout())
            .max_concurrent_inspections(settings.runtime.max_concurrent_inspections)
            .enable_new_services(settings.registry.enable_new_services)
            .default_log_tail(settings.logs.default_tail)
            .archive_limits(settings.archive.limits())
            .build()
    }
}
