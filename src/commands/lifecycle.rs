use crate::output::{print_json, UserOutput};
use serde_json::json;
use stackhub::Engine;

#[derive(Debug, Clone, Copy)]
pub enum LifecycleCommand {
    Start,
    Stop,
    Restart,
}

pub async fn run_lifecycle(
    engine: &Engine,
    name: &str,
    command: LifecycleCommand,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let (verb, done) = match command {
        LifecycleCommand::Start => ("Starting", "started"),
        LifecycleCommand::Stop => ("Stopping", "stopped"),
        LifecycleCommand::Restart => ("Restarting", "restarted"),
    };

    if !json {
        out.progress(&format!("{} {}... ", verb, name));
    }
    let result = match command {
        LifecycleCommand::Start => engine.start(name).await,
        LifecycleCommand::Stop => engine.stop(name).await,
        LifecycleCommand::Restart => engine.restart(name).await,
    };
    if let Err(e) = result {
        if !json {
            out.finish_progress("failed");
        }
        return Err(e.into());
    }

    if json {
        print_json(out, &json!({ "success": true, "service": name, "action": done }))
    } else {
        out.finish_progress(done);
        Ok(())
    }
}

pub async fn run_set_enabled(
    engine: &Engine,
    name: &str,
    enabled: bool,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let record = engine.set_enabled(name, enabled).await?;
    if json {
        return print_json(out, &record);
    }
    out.success(&format!(
        "Service '{}' {}",
        record.name,
        if record.enabled { "enabled" } else { "disabled" }
    ));
    out.status("Run `stackhub validate services` to see whether its containers match.");
    Ok(())
}

pub async fn run_delete(
    engine: &Engine,
    name: &str,
    force: bool,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    engine.delete(name, force).await?;
    if json {
        return print_json(out, &json!({ "success": true, "service": name, "action": "deleted" }));
    }
    out.success(&format!("Service '{}' deleted", name));
    Ok(())
}
