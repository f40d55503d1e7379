use super::{
    parse_compose_ps, ComposeProject, ContainerObservation, DockerClient, DockerError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Cache duration for daemon reachability.
/// Health endpoints are polled; we avoid spawning `docker info` on every call.
const DAEMON_HEALTH_CACHE_DURATION: Duration = Duration::from_secs(5);

/// A command to run inside one container of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecRequest {
    /// Compose service (container) to run in.
    pub container: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Operations the engine needs from a container runtime.
///
/// Implementations must be safe to call concurrently for different projects.
/// `ps` must not mutate anything.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// All containers of the project, running or not. Zero containers is `Ok(vec![])`.
    async fn ps(&self, project: &ComposeProject) -> Result<Vec<ContainerObservation>, DockerError>;

    async fn up(&self, project: &ComposeProject) -> Result<(), DockerError>;

    async fn stop(&self, project: &ComposeProject) -> Result<(), DockerError>;

    async fn restart(&self, project: &ComposeProject) -> Result<(), DockerError>;

    /// Remove the project's containers and networks.
    async fn down(&self, project: &ComposeProject) -> Result<(), DockerError>;

    async fn logs(&self, project: &ComposeProject, tail: usize) -> Result<String, DockerError>;

    async fn exec(
        &self,
        project: &ComposeProject,
        request: &ExecRequest,
    ) -> Result<ExecOutput, DockerError>;

    /// Whether the runtime daemon answers at all.
    async fn ping(&self) -> bool;
}

/// Deadlines for runtime calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeTimeouts {
    /// Lifecycle commands (up/stop/restart/down/exec/logs).
    pub command: Duration,
    /// Read-only inspection (`ps`, daemon ping).
    pub inspect: Duration,
}

impl Default for RuntimeTimeouts {
    fn default() -> Self {
        Self {
            command: Duration::from_secs(120),
            inspect: Duration::from_secs(10),
        }
    }
}

/// [`ContainerRuntime`] backed by the docker compose CLI.
#[derive(Debug)]
pub struct ComposeRuntime {
    client: DockerClient,
    timeouts: RuntimeTimeouts,
    daemon_health: Mutex<Option<(Instant, bool)>>,
}

impl ComposeRuntime {
    pub fn new(client: DockerClient, timeouts: RuntimeTimeouts) -> Self {
        Self {
            client,
            timeouts,
            daemon_health: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &DockerClient {
        &self.client
    }

    fn cached_health(&self) -> Option<bool> {
        let guard = self.daemon_health.lock();
        match *guard {
            Some((checked_at, healthy)) if checked_at.elapsed() < DAEMON_HEALTH_CACHE_DURATION => {
                Some(healthy)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl ContainerRuntime for ComposeRuntime {
    async fn ps(&self, project: &ComposeProject) -> Result<Vec<ContainerObservation>, DockerError> {
        let stdout = self
            .client
            .compose_ps_json(project, self.timeouts.inspect)
            .await?;
        parse_compose_ps(&stdout)
            .map_err(|detail| DockerError::malformed(format!("compose -p {} ps", project.name), detail))
    }

    async fn up(&self, project: &ComposeProject) -> Result<(), DockerError> {
        tracing::debug!("compose up for project '{}'", project.name);
        self.client.compose_up(project, self.timeouts.command).await
    }

    async fn stop(&self, project: &ComposeProject) -> Result<(), DockerError> {
        tracing::debug!("compose stop for project '{}'", project.name);
        self.client.compose_stop(project, self.timeouts.command).await
    }

    async fn restart(&self, project: &ComposeProject) -> Result<(), DockerError> {
        tracing::debug!("compose restart for project '{}'", project.name);
        self.client
            .compose_restart(project, self.timeouts.command)
            .await
    }

    async fn down(&self, project: &ComposeProject) -> Result<(), DockerError> {
        tracing::debug!("compose down for project '{}'", project.name);
        self.client.compose_down(project, self.timeouts.command).await
    }

    async fn logs(&self, project: &ComposeProject, tail: usize) -> Result<String, DockerError> {
        self.client
            .compose_logs(project, tail, self.timeouts.command)
            .await
    }

    async fn exec(
        &self,
        project: &ComposeProject,
        request: &ExecRequest,
    ) -> Result<ExecOutput, DockerError> {
        let output = self
            .client
            .compose_exec(
                project,
                &request.container,
                &request.command,
                request.user.as_deref(),
                self.timeouts.command,
            )
            .await?;
        // A non-zero exit is the command's result, not a runtime failure.
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn ping(&self) -> bool {
        if let Some(healthy) = self.cached_health() {
            return healthy;
        }
        let healthy = self.client.daemon_healthy(self.timeouts.inspect).await;
        *self.daemon_health.lock() = Some((Instant::now(), healthy));
        healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_favour_quick_inspection() {
        let t = RuntimeTimeouts::default();
        assert!(t.inspect < t.command);
    }

    #[test]
    fn health_cache_expires() {
        let runtime = ComposeRuntime::new(DockerClient::new(), RuntimeTimeouts::default());
        assert_eq!(runtime.cached_health(), None);

        *runtime.daemon_health.lock() = Some((Instant::now(), true));
        assert_eq!(runtime.cached_health(), Some(true));

        let stale = Instant::now()
            .checked_sub(DAEMON_HEALTH_CACHE_DURATION + Duration::from_secs(1));
        if let Some(stale) = stale {
            *runtime.daemon_health.lock() = Some((stale, false));
            assert_eq!(runtime.cached_health(), None);
        }
    }

    #[test]
    fn exec_request_omits_missing_user() {
        let req = ExecRequest {
            container: "app".into(),
            command: "ls".into(),
            user: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("user").is_none());
    }
}
