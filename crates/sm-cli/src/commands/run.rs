use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use sm_core::{BodyPart, NodeStatus};
use sm_simulation::{Body, BodySystem, Occurrence, SystemId};

pub fn run(
    config: Option<&Path>,
    scripts: &[String],
    ticks: u64,
    json: bool,
    show_log: bool,
) -> Result<(), String> {
    let body = super::simulate(config, scripts, ticks)?;

    if json {
        let out = body
            .snapshot()
            .to_json_pretty()
            .map_err(|e| format!("JSON serialization error: {e}"))?;
        println!("{out}");
        return Ok(());
    }

    print_header(&body, scripts.len());
    if show_log {
        print_log(&body);
    }
    print_vitals(&body);
    print_parts(&body);
    Ok(())
}

fn print_header(body: &Body, applied: usize) {
    let state = if body.is_alive() {
        "alive".green().bold()
    } else {
        "dead".red().bold()
    };
    println!(
        "  {} {} {}",
        "Body".bold(),
        state,
        format!("(tick {}, {applied} commands applied)", body.tick()).dimmed()
    );
    println!("  {} occurrences logged", body.log().len());
    println!();
}

fn print_log(body: &Body) {
    println!("  {}", "Occurrences".bold().underline());
    println!();
    for entry in body.log().entries() {
        let tick = format!("[tick {:>3}]", entry.tick).dimmed();
        println!("  {tick} {}", colorize(&entry.occurrence, &entry.description));
    }
    if body.log().is_empty() {
        println!("  {}", "(nothing notable)".dimmed());
    }
    println!();
}

fn colorize(occurrence: &Occurrence, description: &str) -> colored::ColoredString {
    match occurrence {
        Occurrence::Fractured
        | Occurrence::Torn
        | Occurrence::NerveSevered
        | Occurrence::NodeDisabled
        | Occurrence::LowBloodPressure => description.red().bold(),
        Occurrence::BleedingStarted
        | Occurrence::Burned { .. }
        | Occurrence::WoundOpened
        | Occurrence::Infected
        | Occurrence::Inflamed
        | Occurrence::SignalLost => description.red(),
        Occurrence::ResourceShortfall { .. } | Occurrence::Starving => description.yellow(),
        Occurrence::BoneSet
        | Occurrence::MuscleRepaired
        | Occurrence::NerveRepaired
        | Occurrence::SignalRestored
        | Occurrence::NodeRestored
        | Occurrence::BleedingStopped
        | Occurrence::WoundClosed
        | Occurrence::InfectionCleared => description.green(),
        Occurrence::NoNewEffect => description.dimmed(),
    }
}

fn print_vitals(body: &Body) {
    let v = body.vitals();
    println!("  {}", "Vitals".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Measure", "Value"]);
    table.add_row(vec!["Blood".to_string(), format_level(v.blood, 100.0)]);
    table.add_row(vec![
        "Blood pressure".to_string(),
        format_level(v.blood_pressure, 100.0),
    ]);
    table.add_row(vec![
        "Oxygen output".to_string(),
        format!("{:.2}", v.oxygen_output),
    ]);
    table.add_row(vec!["Energy".to_string(), format!("{:.1}", v.energy)]);
    table.add_row(vec![
        "Energy output".to_string(),
        format!("{:.2}", v.energy_output),
    ]);
    table.add_row(vec![
        "Strength".to_string(),
        format_level(v.overall_strength * 100.0, 100.0),
    ]);
    table.add_row(vec![
        "Bone integrity".to_string(),
        format_level(v.overall_integrity * 100.0, 100.0),
    ]);
    table.add_row(vec!["Pain".to_string(), format!("{:.1}", v.total_pain)]);
    table.add_row(vec!["Shock".to_string(), format!("{:.2}", v.shock)]);
    table.add_row(vec![
        "Fractured / torn / severed".to_string(),
        format!("{} / {} / {}", v.fractured, v.torn, v.severed),
    ]);
    table.add_row(vec![
        "Bleeding / infected / wounds".to_string(),
        format!("{} / {} / {}", v.bleeding, v.infected, v.open_wounds),
    ]);
    println!("{table}");
    println!();
}

fn print_parts(body: &Body) {
    println!("  {}", "Body Parts".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Part", "Bone", "Vessels", "Force", "Signal", "Pain", "Skin", "Infection", "Conditions",
    ]);

    for part in BodyPart::ALL {
        let muscle = if body.system(SystemId::Muscular).template().has_node(part) {
            format!("{:.1}", body.muscular().force_output(part))
        } else {
            "--".to_string()
        };
        table.add_row(vec![
            part.to_string(),
            format_level(body.skeletal().integrity(part), 100.0),
            format_vessels(body, part),
            muscle,
            format_level(body.nervous().signal_strength(part), 100.0),
            format!("{:.1}", body.nervous().pain(part)),
            format_level(body.integumentary().skin_integrity(part), 100.0),
            format!("{:.1}", body.immune().infection_level(part)),
            conditions(body, part),
        ]);
    }

    println!("{table}");
    println!();
}

fn format_vessels(body: &Body, part: BodyPart) -> String {
    let rate = body.circulatory().bleeding_rate(part);
    if rate > 0.0 {
        format!("{} {:.2}/t", "bleeding".red(), rate)
    } else {
        format!("{:.0}%", body.circulatory().perfusion(part) * 100.0)
    }
}

/// Every condition flag any subsystem holds for `part`, deduplicated.
fn conditions(body: &Body, part: BodyPart) -> String {
    let mut status = NodeStatus::empty();
    for id in SystemId::ALL {
        if let Some(node) = body.system(id).template().node(part) {
            status |= node.status();
        }
    }
    status.remove(NodeStatus::HEALTHY);
    if status.is_empty() {
        "-".dimmed().to_string()
    } else {
        status.to_string().yellow().to_string()
    }
}

fn format_level(value: f64, full: f64) -> String {
    let fraction = if full > 0.0 { value / full } else { 0.0 };
    let text = format!("{value:.1}");
    if fraction <= 0.25 {
        text.red().to_string()
    } else if fraction <= 0.6 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}
