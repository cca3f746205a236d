use std::path::Path;

pub fn run(
    config: Option<&Path>,
    scripts: &[String],
    ticks: u64,
    output: Option<&Path>,
) -> Result<(), String> {
    let body = super::simulate(config, scripts, ticks)?;
    let content = body
        .snapshot()
        .to_json_pretty()
        .map_err(|e| format!("JSON serialization error: {e}"))?;

    if let Some(path) = output {
        std::fs::write(path, &content)
            .map_err(|e| format!("cannot write to {}: {e}", path.display()))?;
        println!("  Exported to {}", path.display());
    } else {
        println!("{content}");
    }
    Ok(())
}
