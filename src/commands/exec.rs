use crate::output::{print_json, UserOutput};
use stackhub::docker::ExecRequest;
use stackhub::Engine;

/// Run a command in a container. Returns the command's exit code.
pub async fn run_exec(
    engine: &Engine,
    name: &str,
    container: &str,
    command: &[String],
    user: Option<String>,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<i32> {
    let request = ExecRequest {
        container: container.to_string(),
        command: command.join(" "),
        user,
    };
    let output = engine.exec(name, &request).await?;

    if json {
        print_json(out, &output)?;
    } else {
        if !output.stdout.is_empty() {
            out.raw(&output.stdout);
        }
        if !output.stderr.is_empty() {
            out.warning(output.stderr.trim_end());
        }
    }
    Ok(output.exit_code)
}
