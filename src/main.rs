mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, ValidateCommands};
use output::CliOutput;
use stackhub::{Authorizer, Engine, Error as HubError, Parser as ConfigParser};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            if let Some(hub_error) = e.downcast_ref::<HubError>() {
                eprintln!("Error: {}", hub_error);
                if let Some(suggestion) = hub_error.suggestion() {
                    eprintln!("\nHint: {}", suggestion);
                }
            } else {
                eprintln!("Error: {:#}", e);
            }
            std::process::exit(1);
        }
    }
}

/// Returns the process exit code.
async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    init_tracing()?;

    let out = CliOutput;

    // ── Commands that need no registry ──────────────────────────────
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            return Ok(0);
        }
        Commands::Doctor => {
            commands::run_doctor(cli.config.as_deref(), &out).await?;
            return Ok(0);
        }
        _ => {}
    }

    // ── Load settings and authorize ─────────────────────────────────
    let loaded = ConfigParser::new().load(cli.config.as_deref())?;
    match &loaded.source {
        Some(path) => tracing::debug!("Using config {}", path.display()),
        None => tracing::debug!("No config file found, using defaults"),
    }
    Authorizer::new(loaded.settings.auth.tokens.clone()).authorize(cli.token.as_deref())?;

    let engine = Engine::from_settings(&loaded.settings).await?;
    let json = cli.json;

    match cli.command {
        Commands::List => commands::run_list(&engine, json, &out).await?,
        Commands::Get { name } => commands::run_get(&engine, &name, json, &out).await?,
        Commands::Start { name } => {
            commands::run_lifecycle(&engine, &name, commands::LifecycleCommand::Start, json, &out)
                .await?
        }
        Commands::Stop { name } => {
            commands::run_lifecycle(&engine, &name, commands::LifecycleCommand::Stop, json, &out)
                .await?
        }
        Commands::Restart { name } => {
            commands::run_lifecycle(
                &engine,
                &name,
                commands::LifecycleCommand::Restart,
                json,
                &out,
            )
            .await?
        }
        Commands::Enable { name } => {
            commands::run_set_enabled(&engine, &name, true, json, &out).await?
        }
        Commands::Disable { name } => {
            commands::run_set_enabled(&engine, &name, false, json, &out).await?
        }
        Commands::Delete { name, force } => {
            commands::run_delete(&engine, &name, force, json, &out).await?
        }
        Commands::Create {
            name,
            file,
            archive,
        } => {
            commands::run_create(
                &engine,
                &name,
                file.as_deref(),
                archive.as_deref(),
                json,
                &out,
            )
            .await?
        }
        Commands::Logs { name, tail } => {
            commands::run_logs(&engine, &name, tail, json, &out).await?
        }
        Commands::Exec {
            name,
            container,
            user,
            command,
        } => {
            return commands::run_exec(&engine, &name, &container, &command, user, json, &out)
                .await;
        }
        Commands::Validate(ValidateCommands::Data) => {
            commands::run_validate_data(&engine, json, &out).await?
        }
        Commands::Validate(ValidateCommands::Services) => {
            commands::run_validate_services(&engine, json, &out).await?
        }
        Commands::Fix { kind, execute } => {
            commands::run_fix(&engine, &kind, execute, json, &out).await?
        }
        Commands::Health => commands::run_health(&engine, json, &out).await?,
        Commands::Doctor | Commands::Completions { .. } => {}
    }

    Ok(0)
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
