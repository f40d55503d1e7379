//! Shared fixtures: a scripted container runtime and an engine wired to it.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use stackhub::compose::{DefinitionParser, YamlDefinitionParser};
use stackhub::docker::{
    ComposeProject, ContainerObservation, ContainerRuntime, ContainerState, DockerError,
    ExecOutput, ExecRequest,
};
use stackhub::{Engine, RecordStore};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const WEB_YAML: &str = "services:\n  app:\n    image: nginx:alpine\n  cache:\n    image: redis:7\n";
pub const SINGLE_YAML: &str = "services:\n  app:\n    image: busybox\n";

#[derive(Default)]
struct FakeState {
    /// Containers per project name.
    containers: HashMap<String, Vec<ContainerObservation>>,
    /// (project, action) pairs that the runtime refuses.
    rejections: HashSet<(String, String)>,
    /// Projects whose `ps` never returns.
    hung: HashSet<String>,
    unreachable: bool,
    calls: Vec<String>,
}

/// In-memory container runtime driven by the definition files on disk.
///
/// `up` creates one running container per declared service, `stop` exits
/// them, `down` removes them.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
    up_delay: Mutex<Option<Duration>>,
    active_ups: AtomicUsize,
    max_active_ups: AtomicUsize,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    pub fn reject(&self, project: &str, action: &str) {
        self.state
            .lock()
            .rejections
            .insert((project.to_string(), action.to_string()));
    }

    pub fn hang(&self, project: &str) {
        self.state.lock().hung.insert(project.to_string());
    }

    pub fn slow_up(&self, delay: Duration) {
        *self.up_delay.lock() = Some(delay);
    }

    /// Highest number of `up` calls seen in flight at once.
    pub fn max_concurrent_ups(&self) -> usize {
        self.max_active_ups.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("ps ") && !c.starts_with("logs ") && c != "ping")
            .collect()
    }

    /// Place containers for `project` directly, one per `(service, state)`.
    pub fn set_containers(&self, project: &str, containers: &[(&str, ContainerState)]) {
        let observed = containers
            .iter()
            .map(|(service, state)| container(project, service, *state))
            .collect();
        self.state
            .lock()
            .containers
            .insert(project.to_string(), observed);
    }

    fn begin(&self, project: &ComposeProject, action: &str) -> Result<(), DockerError> {
        let mut state = self.state.lock();
        state.calls.push(format!("{} {}", action, project.name));
        if state.unreachable {
            return Err(DockerError::DaemonUnavailable {
                command: format!("docker compose -p {} {}", project.name, action),
            });
        }
        if state
            .rejections
            .contains(&(project.name.clone(), action.to_string()))
        {
            return Err(DockerError::cmd_failed(
                format!("docker compose -p {} {}", project.name, action),
                format!("{} refused for {}", action, project.name),
                Some(1),
            ));
        }
        Ok(())
    }

    fn set_all(&self, project: &ComposeProject, target: ContainerState) {
        let services = declared_services(project);
        let mut state = self.state.lock();
        let containers = state.containers.entry(project.name.clone()).or_default();
        for service in services {
            match containers.iter_mut().find(|c| c.service == service) {
                Some(existing) => existing.state = target,
                None => containers.push(container(&project.name, &service, target)),
            }
        }
    }
}

fn declared_services(project: &ComposeProject) -> Vec<String> {
    std::fs::read_to_string(&project.file)
        .ok()
        .and_then(|text| YamlDefinitionParser::new().parse(&text).ok())
        .map(|def| def.service_names().into_iter().map(String::from).collect())
        .unwrap_or_default()
}

pub fn container(project: &str, service: &str, state: ContainerState) -> ContainerObservation {
    ContainerObservation {
        id: format!("{}-{}-id", project, service),
        name: format!("{}-{}-1", project, service),
        image: "fake:latest".to_string(),
        service: service.to_string(),
        state,
        status: if state.is_running() {
            "Up 1 second".to_string()
        } else {
            "Exited (0) 1 second ago".to_string()
        },
        exit_code: if state.is_running() { None } else { Some(0) },
        health: None,
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ps(&self, project: &ComposeProject) -> Result<Vec<ContainerObservation>, DockerError> {
        self.begin(project, "ps")?;
        let hung = self.state.lock().hung.contains(&project.name);
        if hung {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(self
            .state
            .lock()
            .containers
            .get(&project.name)
            .cloned()
            .unwrap_or_default())
    }

    async fn up(&self, project: &ComposeProject) -> Result<(), DockerError> {
        self.begin(project, "up")?;
        let now = self.active_ups.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_ups.fetch_max(now, Ordering::SeqCst);
        let delay = *self.up_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.set_all(project, ContainerState::Running);
        self.active_ups.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, project: &ComposeProject) -> Result<(), DockerError> {
        self.begin(project, "stop")?;
        let mut state = self.state.lock();
        if let Some(containers) = state.containers.get_mut(&project.name) {
            for c in containers.iter_mut() {
                c.state = ContainerState::Exited;
            }
        }
        Ok(())
    }

    async fn restart(&self, project: &ComposeProject) -> Result<(), DockerError> {
        self.begin(project, "restart")?;
        self.set_all(project, ContainerState::Running);
        Ok(())
    }

    async fn down(&self, project: &ComposeProject) -> Result<(), DockerError> {
        self.begin(project, "down")?;
        self.state.lock().containers.remove(&project.name);
        Ok(())
    }

    async fn logs(&self, project: &ComposeProject, tail: usize) -> Result<String, DockerError> {
        self.begin(project, "logs")?;
        Ok((1..=tail.min(3))
            .map(|n| format!("{} | line {}\n", project.name, n))
            .collect())
    }

    async fn exec(
        &self,
        project: &ComposeProject,
        request: &ExecRequest,
    ) -> Result<ExecOutput, DockerError> {
        self.begin(project, "exec")?;
        Ok(ExecOutput {
            exit_code: 0,
            stdout: format!("{}: {}\n", request.container, request.command),
            stderr: String::new(),
        })
    }

    async fn ping(&self) -> bool {
        let mut state = self.state.lock();
        state.calls.push("ping".to_string());
        !state.unreachable
    }
}

/// An engine over a temporary services root and registry.
pub struct Harness {
    pub engine: Arc<Engine>,
    pub runtime: Arc<FakeRuntime>,
    pub root: PathBuf,
    _tmp: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_options(false).await
    }

    pub async fn with_options(enable_new_services: bool) -> Self {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let root = tmp.path().join("services");
        let store = RecordStore::new(tmp.path().join("stackhub.db"))
            .await
            .expect("Failed to open registry");
        store.initialize().await.expect("Failed to initialize registry");

        let runtime = Arc::new(FakeRuntime::new());
        let engine = Engine::builder()
            .store(store)
            .services_root(root.clone())
            .runtime(runtime.clone())
            .inspect_timeout(Duration::from_millis(200))
            .max_concurrent_inspections(4)
            .enable_new_services(enable_new_services)
            .build()
            .expect("Failed to build engine");

        Self {
            engine: Arc::new(engine),
            runtime,
            root,
            _tmp: tmp,
        }
    }

    /// Register `name` with the two-service definition.
    pub async fn create(&self, name: &str) {
        self.engine
            .create_from_definition(name, WEB_YAML)
            .await
            .expect("create should succeed");
    }

    /// A folder under the services root that has no record.
    pub fn write_orphan(&self, name: &str, definition: &str) -> PathBuf {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir).expect("create orphan dir");
        std::fs::write(dir.join("docker-compose.yml"), definition).expect("write orphan def");
        dir
    }
}
