use super::parse_duration_string;
use crate::archive::ArchiveLimits;
use crate::docker::{ComposeCommand, RuntimeTimeouts};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Contents of `stackhub.yaml`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory holding one sub-directory per service.
    pub services_root: PathBuf,
    /// SQLite registry file.
    pub database: PathBuf,
    pub runtime: RuntimeSettings,
    pub registry: RegistrySettings,
    pub logs: LogSettings,
    pub auth: AuthSettings,
    pub archive: ArchiveSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            services_root: PathBuf::from("services"),
            database: PathBuf::from("stackhub.db"),
            runtime: RuntimeSettings::default(),
            registry: RegistrySettings::default(),
            logs: LogSettings::default(),
            auth: AuthSettings::default(),
            archive: ArchiveSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    /// Deadline for up/stop/restart/down/logs/exec.
    pub command_timeout: String,
    /// Deadline for a single service inspection.
    pub inspect_timeout: String,
    pub max_concurrent_inspections: usize,
    /// `auto`, `v2` (`docker compose`) or `v1` (`docker-compose`).
    pub compose_command: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            command_timeout: "120s".to_string(),
            inspect_timeout: "10s".to_string(),
            max_concurrent_inspections: 8,
            compose_command: "auto".to_string(),
        }
    }
}

impl RuntimeSettings {
    /// Parsed timeouts. Unparseable values fall back to defaults; `validate`
    /// rejects them before this is reached in practice.
    pub fn timeouts(&self) -> RuntimeTimeouts {
        let defaults = RuntimeTimeouts::default();
        RuntimeTimeouts {
            command: parse_duration_string(&self.command_timeout).unwrap_or(defaults.command),
            inspect: parse_duration_string(&self.inspect_timeout).unwrap_or(defaults.inspect),
        }
    }

    pub fn inspect_timeout(&self) -> Duration {
        self.timeouts().inspect
    }

    /// `None` means probe for whichever flavour is installed.
    pub fn compose_flavour(&self) -> Option<ComposeCommand> {
        match self.compose_command.trim().to_ascii_lowercase().as_str() {
            "v2" => Some(ComposeCommand::V2),
            "v1" => Some(ComposeCommand::V1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    /// Initial `enabled` flag for newly created or registered services.
    pub enable_new_services: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub default_tail: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { default_tail: 100 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSettings {
    /// Accepted API tokens. Empty disables the check.
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveSettings {
    pub max_entries: usize,
    pub max_total_bytes: u64,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        let limits = ArchiveLimits::default();
        Self {
            max_entries: limits.max_entries,
            max_total_bytes: limits.max_total_bytes,
        }
    }
}

impl ArchiveSettings {
    pub fn limits(&self) -> ArchiveLimits {
        ArchiveLimits {
            max_entries: self.max_entries,
            max_total_bytes: self.max_total_bytes,
        }
    }
}
