use std::fmt;
use std::time::Duration;

/// Structured error type for container runtime (docker CLI) calls.
///
/// Distinguishes "the runtime answered and said no" ([`DockerError::CommandFailed`])
/// from "we never got an answer" (everything else). Callers lean on that split:
/// a refusal is a conflict the user can act on, the rest means the runtime is
/// unreachable.
#[derive(Debug)]
pub enum DockerError {
    /// Command did not finish within its deadline.
    Timeout { command: String, timeout: Duration },

    /// Command ran but exited non-zero.
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// Binary couldn't be executed (not in PATH, permission denied).
    ExecFailed {
        command: String,
        source: std::io::Error,
    },

    /// Daemon not responding (parsed from "Cannot connect to the Docker daemon").
    DaemonUnavailable { command: String },

    /// Command succeeded but its output could not be understood.
    MalformedOutput { command: String, detail: String },
}

impl DockerError {
    pub fn timeout(cmd: impl Into<String>, dur: Duration) -> Self {
        DockerError::Timeout {
            command: cmd.into(),
            timeout: dur,
        }
    }

    /// Build an error from a finished process that exited non-zero.
    ///
    /// Daemon connection failures surface as a non-zero exit from the CLI, so
    /// they are recognised here and reported as [`DockerError::DaemonUnavailable`].
    pub fn failed(cmd: impl Into<String>, output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Self::cmd_failed(cmd, stderr, output.status.code())
    }

    pub fn cmd_failed(
        cmd: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        let command = cmd.into();
        let stderr = stderr.into();
        if stderr.contains("Cannot connect to the Docker daemon")
            || stderr.contains("Is the docker daemon running")
            || stderr.contains("error during connect")
        {
            return DockerError::DaemonUnavailable { command };
        }
        DockerError::CommandFailed {
            command,
            stderr,
            exit_code,
        }
    }

    pub fn exec_failed(cmd: impl Into<String>, err: std::io::Error) -> Self {
        DockerError::ExecFailed {
            command: cmd.into(),
            source: err,
        }
    }

    pub fn malformed(cmd: impl Into<String>, detail: impl Into<String>) -> Self {
        DockerError::MalformedOutput {
            command: cmd.into(),
            detail: detail.into(),
        }
    }

    /// True when the runtime could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            DockerError::Timeout { .. }
                | DockerError::ExecFailed { .. }
                | DockerError::DaemonUnavailable { .. }
        )
    }
}

impl fmt::Display for DockerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerError::Timeout { command, timeout } => {
                write!(
                    f,
                    "'{}' timed out after {}ms",
                    command,
                    timeout.as_millis()
                )
            }
            DockerError::CommandFailed {
                command,
                stderr,
                exit_code,
            } => {
                if let Some(code) = exit_code {
                    write!(f, "'{}' failed (exit code {}): {}", command, code, stderr)
                } else {
                    write!(f, "'{}' failed: {}", command, stderr)
                }
            }
            DockerError::ExecFailed { command, source } => {
                write!(f, "Failed to execute '{}': {}", command, source)
            }
            DockerError::DaemonUnavailable { command } => {
                write!(f, "Docker daemon is not responding (while running '{}')", command)
            }
            DockerError::MalformedOutput { command, detail } => {
                write!(f, "Unexpected output from '{}': {}", command, detail)
            }
        }
    }
}

impl std::error::Error for DockerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DockerError::ExecFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_connection_failure_is_recognised() {
        let err = DockerError::cmd_failed(
            "docker compose ps",
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?",
            Some(1),
        );
        assert!(matches!(err, DockerError::DaemonUnavailable { .. }));
        assert!(err.is_unreachable());
    }

    #[test]
    fn ordinary_failure_is_not_unreachable() {
        let err = DockerError::cmd_failed("docker compose up -d", "no such service: db", Some(1));
        assert!(matches!(err, DockerError::CommandFailed { .. }));
        assert!(!err.is_unreachable());
        assert!(err.to_string().contains("exit code 1"));
    }
}
