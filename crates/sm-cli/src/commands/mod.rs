pub mod anatomy;
pub mod config;
pub mod export;
pub mod run;
pub mod script;

use std::path::Path;

use sm_simulation::{Body, BodyConfig};

/// Load a configuration file, or the defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<BodyConfig, String> {
    let Some(path) = path else {
        tracing::debug!("using default configuration");
        return Ok(BodyConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let config =
        BodyConfig::from_json_str(&text).map_err(|e| format!("{}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Build a body, apply the scripted commands in order and advance `ticks`.
///
/// Every script is parsed before anything is applied, so a typo in the last
/// command does not leave a half-run body behind.
fn simulate(config: Option<&Path>, scripts: &[String], ticks: u64) -> Result<Body, String> {
    let config = load_config(config)?;
    let events = scripts
        .iter()
        .map(|s| script::parse(s))
        .collect::<Result<Vec<_>, _>>()?;

    let mut body = Body::with_config(config).map_err(|e| e.to_string())?;
    for event in events {
        tracing::debug!(?event, "applying command");
        body.command(event);
    }
    body.run(ticks);
    tracing::info!(
        ticks,
        alive = body.is_alive(),
        entries = body.log().len(),
        "simulation finished"
    );
    Ok(body)
}
