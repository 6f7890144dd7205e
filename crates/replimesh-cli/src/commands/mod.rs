//! CLI subcommand implementations.

pub mod run;
pub mod verify;

use replimesh_core::StrategyKind;
use replimesh_sim::ScenarioType;

/// Prints the strategy names the `--strategy` flag accepts.
pub fn strategies() {
    println!("Available topology strategies:");
    for kind in StrategyKind::ALL {
        println!("  {kind}");
    }
}

/// Prints the scenario names the `verify` command accepts.
pub fn scenarios() {
    println!("Available scenarios:");
    for scenario in ScenarioType::ALL {
        println!("  {scenario}");
    }
}
