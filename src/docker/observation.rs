use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state the runtime reports for a single container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Exited,
    Restarting,
    Paused,
    Created,
    Dead,
}

impl ContainerState {
    /// Map the runtime's state string onto the known states.
    ///
    /// `removing` is a transient state on the way out and counts as exited.
    /// Anything unrecognised is treated as dead so it never counts as running.
    pub fn from_runtime(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => ContainerState::Running,
            "exited" | "removing" => ContainerState::Exited,
            "restarting" => ContainerState::Restarting,
            "paused" => ContainerState::Paused,
            "created" => ContainerState::Created,
            "dead" => ContainerState::Dead,
            other => {
                tracing::debug!("Unrecognised container state '{}', treating as dead", other);
                ContainerState::Dead
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerState::Running => "running",
            ContainerState::Exited => "exited",
            ContainerState::Restarting => "restarting",
            ContainerState::Paused => "paused",
            ContainerState::Created => "created",
            ContainerState::Dead => "dead",
        };
        f.pad(s)
    }
}

/// One container as observed at inspection time. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerObservation {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Compose service this container was created for.
    pub service: String,
    pub state: ContainerState,
    /// Free-text runtime detail, e.g. "Up 3 minutes (healthy)".
    pub status: String,
    pub exit_code: Option<i64>,
    pub health: Option<String>,
}

impl ContainerObservation {
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

/// Wire shape of one entry of `compose ps --format json`.
#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "Service", default)]
    service: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "ExitCode", default)]
    exit_code: Option<i64>,
    #[serde(rename = "Health", default)]
    health: Option<String>,
}

impl From<PsEntry> for ContainerObservation {
    fn from(entry: PsEntry) -> Self {
        ContainerObservation {
            id: entry.id,
            name: entry.name,
            image: entry.image,
            service: entry.service,
            state: ContainerState::from_runtime(&entry.state),
            status: entry.status,
            exit_code: entry.exit_code,
            health: entry.health.filter(|h| !h.trim().is_empty()),
        }
    }
}

/// Parse `compose ps --format json` output.
///
/// Compose v2 (newer releases) prints newline-delimited JSON objects; older
/// v2 releases print a single JSON array. Both are accepted. Empty output
/// means the project has no containers.
pub fn parse_compose_ps(stdout: &str) -> Result<Vec<ContainerObservation>, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let entries: Vec<PsEntry> =
            serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON array: {}", e))?;
        return Ok(entries.into_iter().map(ContainerObservation::from).collect());
    }

    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<PsEntry>(line)
                .map(ContainerObservation::from)
                .map_err(|e| format!("invalid JSON line: {}", e))
        })
        .collect()
}
