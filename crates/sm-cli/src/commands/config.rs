use sm_simulation::BodyConfig;

pub fn run() -> Result<(), String> {
    let json = BodyConfig::default()
        .to_json_pretty()
        .map_err(|e| format!("JSON serialization error: {e}"))?;
    println!("{json}");
    Ok(())
}
