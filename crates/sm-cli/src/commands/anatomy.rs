use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use sm_core::{BodyPart, anatomy};

pub fn run() -> Result<(), String> {
    let graph = anatomy();

    println!(
        "  {} {}",
        "Anatomy".bold(),
        format!("({} parts, rooted at {})", BodyPart::ALL.len(), graph.root()).dimmed()
    );
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Part", "Parent", "Depth", "Traits"]);

    for part in graph.outward_order() {
        let traits = graph.traits(part);
        let labels: Vec<&str> = [
            (traits.central, "central"),
            (traits.vital, "vital"),
            (traits.major_vessel, "major vessel"),
            (traits.weight_bearing, "weight bearing"),
            (traits.extremity, "extremity"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect();

        let indent = "  ".repeat(graph.depth(part) as usize);
        table.add_row(vec![
            format!("{indent}{part}"),
            graph
                .parent(part)
                .map_or_else(|| "-".to_string(), |p| p.to_string()),
            graph.depth(part).to_string(),
            labels.join(", "),
        ]);
    }

    println!("{table}");
    Ok(())
}
