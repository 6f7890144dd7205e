//! The `verify` command: determinism double-run plus the invariant
//! suite on a named scenario.

use anyhow::{Result, bail};
use replimesh_sim::{InvariantSuite, ScenarioType, Simulation};

pub fn verify(scenario: &str, seed: u64) -> Result<()> {
    let Some(scenario) = ScenarioType::ALL.iter().copied().find(|s| s.name() == scenario)
    else {
        bail!("unknown scenario `{scenario}` (try `replimesh scenarios`)");
    };

    println!("Verifying {scenario} with seed {seed}...");

    // Pass 1: invariants after every tick. The structural shape checker
    // only applies to fault-free scenarios.
    let suite = if scenario == ScenarioType::FaultyRing {
        InvariantSuite::fault_tolerant()
    } else {
        InvariantSuite::full()
    };
    let mut sim = Simulation::from_scenario(scenario, seed)?.with_invariants(suite);
    let summary = sim.run()?;
    println!(
        "  invariants held for {} ticks ({} mirrors, {} active links)",
        summary.ticks_run, summary.live_mirrors, summary.active_links
    );

    // Pass 2: determinism double-run.
    Simulation::check_determinism(scenario, seed)?;
    println!("  determinism check passed");
    Ok(())
}
