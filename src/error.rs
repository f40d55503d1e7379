// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::docker::DockerError;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Coarse classification of an [`Error`], used by the API layer to pick a
/// response status and by callers that only care about the failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    RuntimeUnavailable,
    PartialFailure,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code for this kind of failure.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::InvalidInput => 400,
            ErrorKind::RuntimeUnavailable => 503,
            ErrorKind::PartialFailure => 207,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::RuntimeUnavailable => "runtime_unavailable",
            ErrorKind::PartialFailure => "partial_failure",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(stackhub::config::validation),
        help("Check stackhub.yaml; durations use formats like '5s', '30s', '1m', '500ms'")
    )]
    Validation(String),

    #[error("Service not found: {0}")]
    #[diagnostic(
        code(stackhub::service::not_found),
        help("List registered services with `stackhub list`")
    )]
    ServiceNotFound(String),

    #[error("Service '{0}' is already registered")]
    #[diagnostic(code(stackhub::service::name_conflict))]
    NameConflict(String),

    #[error("Directory for service '{name}' already exists at {path}")]
    #[diagnostic(
        code(stackhub::service::folder_conflict),
        help("The folder is unregistered; run `stackhub fix all --execute` to register it")
    )]
    FolderConflict { name: String, path: String },

    #[error("Service '{name}' is running ({running}/{total} containers up)")]
    #[diagnostic(
        code(stackhub::service::running),
        help("Stop it first with `stackhub stop {name}` or delete with --force")
    )]
    ServiceRunning {
        name: String,
        running: usize,
        total: usize,
    },

    #[error("Service '{name}' cannot be managed: {reason}")]
    #[diagnostic(
        code(stackhub::service::unmanageable),
        help("Run `stackhub validate data` to see what is wrong with its directory")
    )]
    Unmanageable { name: String, reason: String },

    #[error("Invalid service name '{name}': {reason}")]
    #[diagnostic(code(stackhub::service::invalid_name))]
    InvalidName { name: String, reason: String },

    #[error("Invalid definition: {0}")]
    #[diagnostic(
        code(stackhub::definition::invalid),
        help("The definition must be a compose file with a non-empty 'services' map")
    )]
    InvalidDefinition(String),

    #[error("Invalid archive: {0}")]
    #[diagnostic(code(stackhub::archive::invalid))]
    InvalidArchive(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Container runtime unavailable: {0}")]
    #[diagnostic(
        code(stackhub::runtime::unavailable),
        help("Check that Docker is running with `docker ps`")
    )]
    RuntimeUnavailable(String),

    #[error("Runtime rejected {action} for service '{service}': {reason}")]
    #[diagnostic(
        code(stackhub::runtime::rejected),
        help("Check the service logs with `stackhub logs {service}`")
    )]
    RuntimeRejected {
        service: String,
        action: String,
        reason: String,
    },

    #[error("{failed} of {total} repair actions failed")]
    #[diagnostic(code(stackhub::repair::partial_failure))]
    PartialFailure { failed: usize, total: usize },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Filesystem error: {0}")]
    #[diagnostic(code(stackhub::filesystem::error))]
    Filesystem(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    #[diagnostic(
        code(stackhub::database::error),
        help("Check that the registry database is writable and not held by another process")
    )]
    Database(#[from] tokio_rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<DockerError> for Error {
    fn from(err: DockerError) -> Self {
        Error::RuntimeUnavailable(err.to_string())
    }
}

impl Error {
    /// Map a runtime error raised while performing a lifecycle action.
    ///
    /// A command that ran and exited non-zero means the runtime refused the
    /// action; anything else means we never got an answer.
    pub fn from_runtime_action(service: &str, action: &str, err: DockerError) -> Self {
        match err {
            DockerError::CommandFailed { stderr, .. } => Error::RuntimeRejected {
                service: service.to_string(),
                action: action.to_string(),
                reason: stderr,
            },
            other => Error::RuntimeUnavailable(other.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ServiceNotFound(_) => ErrorKind::NotFound,
            Error::NameConflict(_)
            | Error::FolderConflict { .. }
            | Error::ServiceRunning { .. }
            | Error::Unmanageable { .. }
            | Error::RuntimeRejected { .. } => ErrorKind::Conflict,
            Error::InvalidName { .. }
            | Error::InvalidDefinition(_)
            | Error::InvalidArchive(_)
            | Error::InvalidRequest(_) => ErrorKind::InvalidInput,
            Error::RuntimeUnavailable(_) => ErrorKind::RuntimeUnavailable,
            Error::PartialFailure { .. } => ErrorKind::PartialFailure,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Config(_)
            | Error::Validation(_)
            | Error::Filesystem(_)
            | Error::Yaml(_)
            | Error::Json(_)
            | Error::Io(_)
            | Error::Database(_) => ErrorKind::Internal,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::ServiceNotFound(name) => Some(format!(
                "No service named '{}' is registered. Check `stackhub list`, or run `stackhub validate data` to look for an unregistered folder.",
                name
            )),
            Error::ServiceRunning { name, .. } => Some(format!(
                "Stop the service with `stackhub stop {}` or pass --force to delete it anyway.",
                name
            )),
            Error::NameConflict(name) => Some(format!(
                "Pick a different name or delete the existing service with `stackhub delete {}`.",
                name
            )),
            Error::Unmanageable { .. } => Some(
                "Restore the service directory, or run `stackhub fix data --execute` to drop records whose directory is gone.".to_string()
            ),
            Error::InvalidName { .. } => Some(
                "Service names use lowercase letters, digits and hyphens, start with a letter or digit, and are at most 63 characters.".to_string()
            ),
            Error::RuntimeUnavailable(_) => Some(
                "Check that Docker is running: docker ps".to_string()
            ),
            Error::RuntimeRejected { service, .. } => Some(format!(
                "Inspect the service with `stackhub logs {}`.",
                service
            )),
            Error::PartialFailure { .. } => Some(
                "Re-run `stackhub validate data` and `stackhub validate services` to see what drift remains.".to_string()
            ),
            Error::Config(_) | Error::Validation(_) => Some(
                "Check stackhub.yaml or pass --config explicitly".to_string()
            ),
            Error::Unauthorized(_) => Some(
                "Pass a valid token with --token or STACKHUB_TOKEN".to_string()
            ),
            Error::Database(e) => {
                // String matching is unavoidable here: tokio_rusqlite wraps the
                // underlying rusqlite error opaquely, so we can't match on error codes.
                let err_str = e.to_string();
                if err_str.contains("database is locked") || err_str.contains("SQLITE_BUSY") {
                    Some(
                        "Another stackhub instance may be writing the registry. Retry, or check for stale lock files next to the database.".to_string()
                    )
                } else if err_str.contains("database disk image is malformed") || err_str.contains("SQLITE_CORRUPT") {
                    Some(
                        "Registry database corrupted. Back it up, then try:\n  sqlite3 registry.db '.recover' | sqlite3 registry.recovered.db".to_string()
                    )
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
