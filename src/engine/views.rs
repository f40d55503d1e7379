use crate::reconcile::RealStatus;
use crate::state::ServiceRecord;
use serde::{Deserialize, Serialize};

/// A record as returned to callers: declared fields plus observed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceView {
    #[serde(flatten)]
    pub record: ServiceRecord,
    pub real_status: RealStatus,
    /// Definition text; only filled in for single-service reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsView {
    pub service: String,
    pub logs: String,
    /// False when `logs` is placeholder text rather than runtime output.
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub runtime_available: bool,
    /// Registered services.
    pub services: usize,
    pub version: String,
}
