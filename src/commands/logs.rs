use crate::output::{print_json, UserOutput};
use stackhub::Engine;

pub async fn run_logs(
    engine: &Engine,
    name: &str,
    tail: Option<usize>,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let view = engine.logs(name, tail).await?;
    if json {
        return print_json(out, &view);
    }

    if !view.available {
        out.warning(&view.logs);
    } else if view.logs.trim().is_empty() {
        out.status(&format!("No logs available for service '{}'", name));
    } else {
        out.raw(&view.logs);
    }
    Ok(())
}
