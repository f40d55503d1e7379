use crate::output::UserOutput;
use stackhub::docker::DockerClient;
use stackhub::{Parser, RecordStore};
use std::path::Path;
use std::time::Duration;

pub async fn run_doctor(config: Option<&Path>, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status("Checking system requirements...\n");

    let mut all_ok = true;
    let client = DockerClient::new();

    // Check Docker
    out.progress("Docker: ");
    match client.version().await {
        Ok(version) => {
            out.finish_progress(&version);

            // Check Docker daemon is actually running
            out.progress("Docker daemon: ");
            if client.daemon_healthy(Duration::from_secs(10)).await {
                out.finish_progress("Running");
            } else {
                out.finish_progress(
                    "Not running (start Docker Desktop or run: sudo systemctl start docker)",
                );
                all_ok = false;
            }
        }
        Err(_) => {
            out.finish_progress("Not found");
            all_ok = false;
        }
    }

    // Check compose (v2 plugin or standalone v1)
    out.progress("docker compose: ");
    match client.compose_version().await {
        Ok(version) => out.finish_progress(&version),
        Err(_) => {
            out.finish_progress("Not found");
            all_ok = false;
        }
    }

    // Check configuration
    out.progress("Configuration: ");
    let settings = match Parser::new().load(config) {
        Ok(loaded) => {
            match &loaded.source {
                Some(path) => out.finish_progress(&path.display().to_string()),
                None => out.finish_progress("none found, using defaults"),
            }
            Some(loaded.settings)
        }
        Err(e) => {
            out.finish_progress(&format!("invalid ({})", e));
            all_ok = false;
            None
        }
    };

    if let Some(settings) = settings {
        out.progress("Services root: ");
        let root = &settings.services_root;
        if root.is_dir() {
            out.finish_progress(&root.display().to_string());
        } else {
            out.finish_progress(&format!(
                "{} (missing, created on first service)",
                root.display()
            ));
        }

        out.progress("Registry: ");
        match RecordStore::new(settings.database.clone()).await {
            Ok(store) => match store.initialize().await {
                Ok(()) => match store.list().await {
                    Ok(records) => out.finish_progress(&format!(
                        "{} ({} services)",
                        settings.database.display(),
                        records.len()
                    )),
                    Err(e) => {
                        out.finish_progress(&format!("unreadable ({})", e));
                        all_ok = false;
                    }
                },
                Err(e) => {
                    out.finish_progress(&format!("schema problem ({})", e));
                    all_ok = false;
                }
            },
            Err(e) => {
                out.finish_progress(&format!("cannot open ({})", e));
                all_ok = false;
            }
        }
    }

    out.blank();
    if all_ok {
        out.success("All required dependencies are installed");
    } else {
        out.status("Some checks failed");
        out.error("\nInstallation guides:");
        out.error("  Docker: https://docs.docker.com/get-docker/");
        out.error("  Compose: https://docs.docker.com/compose/install/");
    }

    Ok(())
}
