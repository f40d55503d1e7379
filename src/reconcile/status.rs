use crate::docker::ContainerObservation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Aggregate state of one service, derived on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Running,
    PartiallyRunning,
    Stopped,
    /// The service's directory or definition no longer resolves, or the
    /// definition declares nothing and nothing is running.
    NotFound,
    /// Inspection did not complete in time.
    Unknown,
    /// Inspection failed: runtime unreachable or definition malformed.
    Error,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Running => "running",
            StatusKind::PartiallyRunning => "partially_running",
            StatusKind::Stopped => "stopped",
            StatusKind::NotFound => "not_found",
            StatusKind::Unknown => "unknown",
            StatusKind::Error => "error",
        }
    }

    /// Whether at least one container is up.
    pub fn has_running(&self) -> bool {
        matches!(self, StatusKind::Running | StatusKind::PartiallyRunning)
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Declared intent merged with observed containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealStatus {
    pub status: StatusKind,
    pub containers: Vec<ContainerObservation>,
    pub running_count: usize,
    pub total_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RealStatus {
    /// Derive status from the services a definition declares and the
    /// containers the runtime reports.
    ///
    /// Declared services with no container count toward `total_count`
    /// as not running.
    pub fn from_observations<'a>(
        declared: impl IntoIterator<Item = &'a str>,
        containers: Vec<ContainerObservation>,
    ) -> Self {
        let observed: HashSet<&str> = containers.iter().map(|c| c.service.as_str()).collect();
        let missing = declared
            .into_iter()
            .filter(|name| !observed.contains(name))
            .count();

        let running_count = containers.iter().filter(|c| c.is_running()).count();
        let total_count = containers.len() + missing;

        let status = if total_count == 0 {
            StatusKind::NotFound
        } else if running_count == total_count {
            StatusKind::Running
        } else if running_count == 0 {
            StatusKind::Stopped
        } else {
            StatusKind::PartiallyRunning
        };

        RealStatus {
            status,
            containers,
            running_count,
            total_count,
            error: if status == StatusKind::NotFound {
                Some("definition declares no services and no containers exist".to_string())
            } else {
                None
            },
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::empty(StatusKind::NotFound, reason)
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::empty(StatusKind::Unknown, reason)
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::empty(StatusKind::Error, reason)
    }

    fn empty(status: StatusKind, reason: impl Into<String>) -> Self {
        RealStatus {
            status,
            containers: Vec::new(),
            running_count: 0,
            total_count: 0,
            error: Some(reason.into()),
        }
    }
}
