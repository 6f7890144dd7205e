//! Predefined simulation scenarios.
//!
//! Each scenario bundles a config table, a starting strategy and the
//! control actions to schedule, so the CLI and the end-to-end tests
//! exercise exactly the same set-ups.

use replimesh_config::SimProperties;
use replimesh_core::{Action, StrategyKind};

/// Named end-to-end scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioType {
    /// Balanced tree of ten mirrors, no faults, no control actions.
    TreeBaseline,
    /// Tree baseline, grown to twenty mirrors at tick 10.
    TreeGrowth,
    /// Ten-mirror full mesh converging to 45 active links.
    FullMeshConvergence,
    /// Five-mirror ring, one insertion at tick 5.
    RingInsertion,
    /// Ring under 2% per-tick crash probability.
    FaultyRing,
}

/// A scenario ready to run: config, strategy, scheduled actions.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub props: SimProperties,
    pub strategy: StrategyKind,
    pub actions: Vec<(Action, u64)>,
}

impl ScenarioType {
    pub const ALL: [ScenarioType; 5] = [
        ScenarioType::TreeBaseline,
        ScenarioType::TreeGrowth,
        ScenarioType::FullMeshConvergence,
        ScenarioType::RingInsertion,
        ScenarioType::FaultyRing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenarioType::TreeBaseline => "tree-baseline",
            ScenarioType::TreeGrowth => "tree-growth",
            ScenarioType::FullMeshConvergence => "full-mesh-convergence",
            ScenarioType::RingInsertion => "ring-insertion",
            ScenarioType::FaultyRing => "faulty-ring",
        }
    }

    /// Materialises the scenario with the given seed.
    pub fn build(self, seed: u64) -> Scenario {
        match self {
            ScenarioType::TreeBaseline => Scenario {
                props: base_props(10, 3, 50, seed, 0.0),
                strategy: StrategyKind::BalancedTree,
                actions: Vec::new(),
            },
            ScenarioType::TreeGrowth => Scenario {
                props: base_props(10, 3, 50, seed, 0.0),
                strategy: StrategyKind::BalancedTree,
                actions: vec![(Action::MirrorChange { target: 20 }, 10)],
            },
            ScenarioType::FullMeshConvergence => Scenario {
                props: base_props(10, 3, 30, seed, 0.0),
                strategy: StrategyKind::FullyConnected,
                actions: Vec::new(),
            },
            ScenarioType::RingInsertion => Scenario {
                props: base_props(5, 2, 40, seed, 0.0),
                strategy: StrategyKind::Ring,
                actions: vec![(Action::MirrorChange { target: 6 }, 5)],
            },
            ScenarioType::FaultyRing => Scenario {
                props: base_props(12, 2, 60, seed, 0.02),
                strategy: StrategyKind::Ring,
                actions: Vec::new(),
            },
        }
    }
}

impl std::fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared timing table used by every scenario.
fn base_props(mirrors: u64, links_per_mirror: u64, ticks: u64, seed: u64, faults: f64) -> SimProperties {
    let toml = format!(
        r"
        startup_time_min = 1
        startup_time_max = 3
        ready_time_min = 1
        ready_time_max = 2
        stop_time_min = 1
        stop_time_max = 2
        link_activation_time_min = 1
        link_activation_time_max = 2
        link_bandwidth = 32
        max_bandwidth = 10000
        fault_probability = {faults}
        file_size = 64
        num_mirrors = {mirrors}
        num_links_per_mirror = {links_per_mirror}
        seed = {seed}
        sim_time = {ticks}
        "
    );
    SimProperties::from_table(toml.parse().expect("scenario config is valid TOML"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_materialises() {
        for scenario in ScenarioType::ALL {
            let built = scenario.build(1);
            assert!(built.props.contains("num_mirrors"));
        }
    }
}
