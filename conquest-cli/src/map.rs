//! Map command - load, validate and summarise a board

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use conquest_core::{MapSpec, Topology};

/// Summary of a validated board
#[derive(Clone, Debug, PartialEq, Eq)]
struct MapSummary {
    territories: usize,
    borders: usize,
    continents: Vec<(String, u32, usize)>,
}

/// Run map command
pub fn run(topology: &Topology) -> Result<()> {
    let summary = summarize(topology);
    print_summary(&summary);
    Ok(())
}

/// Load `path` if given, the standard board otherwise
pub fn load_topology(path: Option<&Path>) -> Result<Arc<Topology>> {
    let topology = match path {
        Some(path) => {
            let spec = MapSpec::load(path)?;
            Topology::from_spec(&spec)
                .with_context(|| format!("Invalid map: {}", path.display()))?
        }
        None => Topology::standard().context("Standard map failed validation")?,
    };
    tracing::debug!(territories = topology.len(), "map loaded");
    Ok(Arc::new(topology))
}

fn summarize(topology: &Topology) -> MapSummary {
    let degree: usize = topology
        .territories()
        .map(|t| topology.neighbours(t).len())
        .sum();

    MapSummary {
        territories: topology.len(),
        borders: degree / 2,
        continents: topology
            .continents()
            .iter()
            .map(|c| (c.name.clone(), c.bonus, c.members.len()))
            .collect(),
    }
}

fn print_summary(summary: &MapSummary) {
    println!("\n=== Map ===");
    println!("Territories: {}", summary.territories);
    println!("Borders:     {}", summary.borders);
    println!("\nContinents:");
    for (name, bonus, members) in &summary.continents {
        println!("  {:<16} {:>2} territories, bonus {}", name, members, bonus);
    }
}
