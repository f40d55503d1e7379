//! Centralized Docker CLI client.
//!
//! All docker and compose CLI interactions go through `DockerClient`, which
//! provides consistent timeout handling, error mapping to [`DockerError`], and a
//! single point where the `docker` / `docker-compose` commands are constructed.

use super::DockerError;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Docker Compose command flavour (v2 plugin or v1 standalone binary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCommand {
    /// `docker compose`
    V2,
    /// `docker-compose`
    V1,
}

impl ComposeCommand {
    fn program_and_prefix(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            ComposeCommand::V2 => ("docker", &["compose"]),
            ComposeCommand::V1 => ("docker-compose", &[]),
        }
    }
}

/// A compose project as the runtime sees it: a project name plus the
/// definition file that describes its containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    pub name: String,
    pub file: PathBuf,
}

impl ComposeProject {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }

    /// Directory compose runs in; relative paths inside the definition resolve here.
    pub fn dir(&self) -> &Path {
        self.file.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Centralized client for Docker CLI operations.
///
/// Cheap to clone; the compose flavour is detected once per client and cached.
#[derive(Debug, Clone, Default)]
pub struct DockerClient {
    compose: std::sync::Arc<OnceCell<ComposeCommand>>,
}

impl DockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed compose flavour instead of probing for one.
    pub fn with_compose_command(command: ComposeCommand) -> Self {
        Self {
            compose: std::sync::Arc::new(OnceCell::new_with(Some(command))),
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Run a program with a timeout, returning raw Output.
    async fn run_program(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<Output, DockerError> {
        let cmd_str = format!("{} {}", program, args.join(" "));
        let mut command = tokio::process::Command::new(program);
        command.args(args).kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(DockerError::exec_failed(cmd_str, e)),
            Err(_) => Err(DockerError::timeout(cmd_str, timeout)),
        }
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<Output, DockerError> {
        self.run_program("docker", args, None, timeout).await
    }

    /// Resolve which compose flavour is installed (cached after the first probe).
    pub async fn compose_command(&self) -> Result<ComposeCommand, DockerError> {
        self.compose
            .get_or_try_init(|| async {
                let v2 = self
                    .run(&["compose", "version"], Duration::from_secs(5))
                    .await;
                if let Ok(ref o) = v2 {
                    if o.status.success() {
                        return Ok(ComposeCommand::V2);
                    }
                }
                let v1 = self
                    .run_program(
                        "docker-compose",
                        &["--version"],
                        None,
                        Duration::from_secs(5),
                    )
                    .await;
                match v1 {
                    Ok(o) if o.status.success() => Ok(ComposeCommand::V1),
                    Ok(o) => Err(DockerError::failed("docker-compose --version", &o)),
                    Err(e) => Err(e),
                }
            })
            .await
            .copied()
    }

    /// Run a compose subcommand scoped to `project`.
    async fn compose(
        &self,
        project: &ComposeProject,
        sub_args: &[&str],
        timeout: Duration,
    ) -> Result<Output, DockerError> {
        let flavour = self.compose_command().await?;
        let (program, prefix) = flavour.program_and_prefix();
        let file = project.file.to_string_lossy().into_owned();

        let mut args: Vec<&str> = prefix.to_vec();
        args.extend_from_slice(&["-p", project.name.as_str(), "-f", file.as_str()]);
        args.extend_from_slice(sub_args);

        self.run_program(program, &args, Some(project.dir()), timeout)
            .await
    }

    /// Run a compose subcommand and require exit status 0.
    async fn compose_success(
        &self,
        project: &ComposeProject,
        sub_args: &[&str],
        timeout: Duration,
    ) -> Result<Output, DockerError> {
        let output = self.compose(project, sub_args, timeout).await?;
        if output.status.success() {
            Ok(output)
        } else {
            let cmd_str = format!("compose -p {} {}", project.name, sub_args.join(" "));
            Err(DockerError::failed(cmd_str, &output))
        }
    }

    // ========================================================================
    // Project lifecycle
    // ========================================================================

    /// `compose up -d`: create and start every container of the project.
    pub async fn compose_up(
        &self,
        project: &ComposeProject,
        timeout: Duration,
    ) -> Result<(), DockerError> {
        self.compose_success(project, &["up", "-d"], timeout)
            .await
            .map(|_| ())
    }

    /// `compose stop`: stop containers but keep them, so they stay inspectable.
    pub async fn compose_stop(
        &self,
        project: &ComposeProject,
        timeout: Duration,
    ) -> Result<(), DockerError> {
        self.compose_success(project, &["stop"], timeout)
            .await
            .map(|_| ())
    }

    pub async fn compose_restart(
        &self,
        project: &ComposeProject,
        timeout: Duration,
    ) -> Result<(), DockerError> {
        self.compose_success(project, &["restart"], timeout)
            .await
            .map(|_| ())
    }

    /// `compose down --remove-orphans`: remove containers and networks.
    pub async fn compose_down(
        &self,
        project: &ComposeProject,
        timeout: Duration,
    ) -> Result<(), DockerError> {
        self.compose_success(project, &["down", "--remove-orphans"], timeout)
            .await
            .map(|_| ())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Raw `compose ps -a --format json` output for the project.
    pub async fn compose_ps_json(
        &self,
        project: &ComposeProject,
        timeout: Duration,
    ) -> Result<String, DockerError> {
        let output = self
            .compose_success(project, &["ps", "-a", "--format", "json"], timeout)
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    // ========================================================================
    // Exec / Logs
    // ========================================================================

    /// Fetch combined logs for all containers of the project.
    pub async fn compose_logs(
        &self,
        project: &ComposeProject,
        tail: usize,
        timeout: Duration,
    ) -> Result<String, DockerError> {
        let tail_str = tail.to_string();
        let output = self
            .compose_success(
                project,
                &["logs", "--no-color", "--tail", &tail_str],
                timeout,
            )
            .await?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            text.push_str(&stderr);
        }
        Ok(text)
    }

    /// Run `sh -c <command>` inside a compose service's container.
    pub async fn compose_exec(
        &self,
        project: &ComposeProject,
        service: &str,
        command: &str,
        user: Option<&str>,
        timeout: Duration,
    ) -> Result<Output, DockerError> {
        let mut args = vec!["exec", "-T"];
        if let Some(user) = user {
            args.extend_from_slice(&["--user", user]);
        }
        args.extend_from_slice(&[service, "/bin/sh", "-c", command]);
        self.compose(project, &args, timeout).await
    }

    // ========================================================================
    // Daemon health
    // ========================================================================

    /// Check if the Docker daemon is healthy.
    pub async fn daemon_healthy(&self, timeout: Duration) -> bool {
        match self
            .run(&["info", "--format", "{{.ServerVersion}}"], timeout)
            .await
        {
            Ok(o) => o.status.success(),
            Err(_) => false,
        }
    }

    /// Get Docker version string.
    pub async fn version(&self) -> Result<String, DockerError> {
        let output = self.run(&["--version"], Duration::from_secs(5)).await?;
        if !output.status.success() {
            return Err(DockerError::failed("docker --version", &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Compose version string for whichever flavour is installed.
    pub async fn compose_version(&self) -> Result<String, DockerError> {
        let flavour = self.compose_command().await?;
        let (program, prefix) = flavour.program_and_prefix();
        let mut args: Vec<&str> = prefix.to_vec();
        args.push(if flavour == ComposeCommand::V2 {
            "version"
        } else {
            "--version"
        });
        let output = self
            .run_program(program, &args, None, Duration::from_secs(5))
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_dir_is_definition_parent() {
        let project = ComposeProject::new("web", "/srv/stacks/web/docker-compose.yml");
        assert_eq!(project.dir(), Path::new("/srv/stacks/web"));
    }

    #[tokio::test]
    async fn fixed_compose_command_skips_probe() {
        let client = DockerClient::with_compose_command(ComposeCommand::V1);
        assert_eq!(client.compose_command().await.unwrap(), ComposeCommand::V1);
    }

    #[tokio::test]
    async fn missing_binary_is_exec_failure() {
        let client = DockerClient::new();
        let err = client
            .run_program(
                "stackhub-definitely-not-a-binary",
                &["ps"],
                None,
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DockerError::ExecFailed { .. }));
        assert!(err.is_unreachable());
    }
}
