use crate::docker::{ComposeProject, ContainerObservation, ContainerRuntime, DockerError};
use std::sync::Arc;
use std::time::Duration;

/// Read-only view of the runtime, one project at a time.
///
/// Applies its own deadline on top of whatever the runtime enforces, so a
/// hung runtime call surfaces as [`DockerError::Timeout`] rather than
/// stalling an audit.
#[derive(Clone)]
pub struct RuntimeInspector {
    runtime: Arc<dyn ContainerRuntime>,
    timeout: Duration,
}

impl RuntimeInspector {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, timeout: Duration) -> Self {
        Self { runtime, timeout }
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub async fn inspect(
        &self,
        project: &ComposeProject,
    ) -> Result<Vec<ContainerObservation>, DockerError> {
        match tokio::time::timeout(self.timeout, self.runtime.ps(project)).await {
            Ok(result) => result,
            Err(_) => Err(DockerError::timeout(
                format!("compose -p {} ps", project.name),
                self.timeout,
            )),
        }
    }
}
