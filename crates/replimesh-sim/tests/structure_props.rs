//! Property tests: structural invariants hold across fleet sizes.

use proptest::prelude::*;
use replimesh_config::SimProperties;
use replimesh_core::StrategyKind;
use replimesh_sim::{InvariantSuite, Simulation};

fn props(mirrors: u64, k: u64, seed: u64) -> SimProperties {
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
        file_size = 64
        num_mirrors = {mirrors}
        num_links_per_mirror = {k}
        seed = {seed}
        sim_time = 25
        "
    );
    SimProperties::from_table(toml.parse().expect("test config parses"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn trees_stay_trees(mirrors in 2u64..40, seed in 0u64..1000) {
        let mut sim = Simulation::from_props(props(mirrors, 3, seed), StrategyKind::BalancedTree)
            .unwrap()
            .with_invariants(InvariantSuite::full());
        let summary = sim.run().unwrap();
        prop_assert_eq!(summary.live_mirrors as u64, mirrors);
        prop_assert_eq!(summary.active_links as u64, mirrors - 1);
    }

    #[test]
    fn rings_stay_rings(mirrors in 3u64..30, seed in 0u64..1000) {
        let mut sim = Simulation::from_props(props(mirrors, 2, seed), StrategyKind::Ring)
            .unwrap()
            .with_invariants(InvariantSuite::full());
        let summary = sim.run().unwrap();
        prop_assert_eq!(summary.active_links as u64, mirrors);
    }

    #[test]
    fn cliques_hold_all_pairs(mirrors in 2u64..16, seed in 0u64..1000) {
        let mut sim = Simulation::from_props(props(mirrors, 2, seed), StrategyKind::FullyConnected)
            .unwrap()
            .with_invariants(InvariantSuite::full());
        let summary = sim.run().unwrap();
        prop_assert_eq!(summary.active_links as u64, mirrors * (mirrors - 1) / 2);
    }

    #[test]
    fn n_connected_hits_its_target_figure(mirrors in 5u64..30, k in 1u64..4, seed in 0u64..1000) {
        prop_assume!(mirrors > k);
        let mut sim = Simulation::from_props(props(mirrors, k, seed), StrategyKind::NConnected)
            .unwrap()
            .with_invariants(InvariantSuite::full());
        let summary = sim.run().unwrap();
        prop_assert_eq!(summary.active_links as u64, summary.target_links);
        prop_assert_eq!(summary.target_links, (mirrors * k).div_ceil(2));
    }
}
