//! Lifecycle actions against the runtime, shared by direct requests and repair.

use crate::docker::ContainerRuntime;
use crate::error::{Error, Result};
use crate::reconcile::project_for;
use crate::state::ServiceRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run `action` for `record`. The caller holds the service lock.
///
/// Does not consult or change the enabled flag.
pub async fn perform(
    runtime: &dyn ContainerRuntime,
    record: &ServiceRecord,
    action: LifecycleAction,
) -> Result<()> {
    let project = project_for(record)?;
    let result = match action {
        LifecycleAction::Start => runtime.up(&project).await,
        LifecycleAction::Stop => runtime.stop(&project).await,
        LifecycleAction::Restart => runtime.restart(&project).await,
    };
    result.map_err(|e| Error::from_runtime_action(&record.name, action.as_str(), e))?;
    info!("Service '{}': {} completed", record.name, action);
    Ok(())
}
