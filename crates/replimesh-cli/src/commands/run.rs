//! The `run` command: load config, build the network, tick to the end.

use anyhow::{Context, Result};
use replimesh_config::{SimProperties, keys};
use replimesh_core::StrategyKind;
use replimesh_sim::Simulation;

pub fn run(
    config_path: &str,
    strategy: &str,
    headless: bool,
    seed: Option<u64>,
    ticks: Option<u64>,
) -> Result<()> {
    let strategy: StrategyKind = strategy.parse()?;
    let mut props = SimProperties::from_file(config_path)
        .with_context(|| format!("loading config from {config_path}"))?;
    if let Some(seed) = seed {
        props.set(keys::SEED, seed as i64);
    }
    if let Some(ticks) = ticks {
        props.set(keys::SIM_TIME, ticks as i64);
    }

    let mut sim = Simulation::from_props(props, strategy)?;
    let summary = sim.run()?;

    if headless {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} over {} ticks (seed {})",
        summary.strategy, summary.ticks_run, summary.seed
    );
    println!(
        "  mirrors: {} live, {} holding the payload",
        summary.live_mirrors, summary.mirrors_with_data
    );
    println!(
        "  links: {} active of {} targeted",
        summary.active_links, summary.target_links
    );
    println!("  bandwidth: {} units moved", summary.total_bandwidth);
    for (name, line) in &summary.reports {
        println!("  [{name}] {line}");
    }
    Ok(())
}
