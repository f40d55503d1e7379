use crate::output::{print_json, UserOutput};
use anyhow::Context;
use stackhub::Engine;
use std::path::Path;

pub async fn run_create(
    engine: &Engine,
    name: &str,
    file: Option<&Path>,
    archive: Option<&Path>,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let record = match (file, archive) {
        (Some(file), _) => {
            let yaml = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            engine.create_from_definition(name, &yaml).await?
        }
        (None, Some(archive)) => {
            let bytes = tokio::fs::read(archive)
                .await
                .with_context(|| format!("Failed to read {}", archive.display()))?;
            engine.create_from_archive(name, bytes).await?
        }
        (None, None) => anyhow::bail!("Either --file or --archive is required"),
    };

    if json {
        return print_json(out, &record);
    }
    out.success(&format!(
        "Service '{}' registered at {}",
        record.name,
        record.path.display()
    ));
    if !record.enabled {
        out.status(&format!(
            "It is disabled; start it with `stackhub start {}` and mark it desired with `stackhub enable {}`.",
            record.name, record.name
        ));
    }
    Ok(())
}
