use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackhub")]
#[command(version)]
#[command(about = "stackhub - Registry, reconciliation and drift repair for compose stacks")]
pub struct Cli {
    /// Config file path (defaults to stackhub.yaml in this or a parent directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// API token, required when `auth.tokens` is configured
    #[arg(long, env = "STACKHUB_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered services with their live status
    List,
    /// Show one service, including its definition
    Get {
        /// Service name
        name: String,
    },
    /// Start a service's containers
    Start {
        /// Service name
        name: String,
    },
    /// Stop a service's containers
    Stop {
        /// Service name
        name: String,
    },
    /// Restart a service's containers
    Restart {
        /// Service name
        name: String,
    },
    /// Mark a service as desired-running (does not start it)
    Enable {
        /// Service name
        name: String,
    },
    /// Mark a service as desired-stopped (does not stop it)
    Disable {
        /// Service name
        name: String,
    },
    /// Delete a service, its directory and its record
    Delete {
        /// Service name
        name: String,
        /// Tear down running containers instead of refusing
        #[arg(short, long)]
        force: bool,
    },
    /// Register a new service from a compose file or a ZIP archive
    Create {
        /// Service name (lowercase letters, digits and '-')
        name: String,
        /// Compose YAML file to copy into the service directory
        #[arg(short, long, conflicts_with = "archive", required_unless_present = "archive")]
        file: Option<PathBuf>,
        /// ZIP archive to unpack into the service directory
        #[arg(short, long)]
        archive: Option<PathBuf>,
    },
    /// Show recent log output of a service
    Logs {
        /// Service name
        name: String,
        /// Number of lines to show
        #[arg(short = 'n', long)]
        tail: Option<usize>,
    },
    /// Run a command inside one of a service's containers
    Exec {
        /// Service name
        name: String,
        /// Compose service (container) to run in
        container: String,
        /// Run as this user
        #[arg(short, long)]
        user: Option<String>,
        /// Command line to run
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// Audit the registry against the filesystem or the container runtime
    #[command(subcommand)]
    Validate(ValidateCommands),
    /// Plan (or execute) repairs for detected drift
    Fix {
        /// What to repair: all, data (alias filesystem), state
        #[arg(default_value = "all")]
        kind: String,
        /// Apply the planned actions instead of only listing them
        #[arg(short, long)]
        execute: bool,
    },
    /// Report engine and runtime health
    Health,
    /// Check system requirements (Docker, compose, config, registry)
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ValidateCommands {
    /// Compare records with the service directories on disk
    Data,
    /// Compare each service's enabled flag with its containers
    Services,
}
