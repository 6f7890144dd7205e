//! Effect-predictor behaviour over a live network.

use replimesh_config::{ConfigError, SimProperties};
use replimesh_core::{Action, Network, StrategyKind};
use replimesh_sim::Simulation;

fn props(mirrors: u64, k: u64) -> SimProperties {
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
        seed = 5
        sim_time = 30
        "
    );
    SimProperties::from_table(toml.parse().expect("test config parses"))
}

#[test]
fn n_connected_growth_prediction_is_pure_and_bounded() {
    let mut sim = Simulation::from_props(props(10, 3), StrategyKind::NConnected).unwrap();
    sim.run_until(10).unwrap();
    let network = sim.network();

    let action = Action::MirrorChange { target: 11 };
    let first = network.predict(&action).unwrap();
    let second = network.predict(&action).unwrap();

    assert_eq!(first, second);
    assert!((-1.0..=1.0).contains(&first.delta_active_links));
    assert!((-100..=100).contains(&first.delta_bandwidth));
    assert!((-100..=100).contains(&first.delta_time_to_write));
    // Growth pays startup + readiness + activation in full.
    assert_eq!(first.latency, 3 + 2 + 2);
    assert!(first.delta_active_links > 0.0);
}

#[test]
fn shrink_predictions_are_immediate() {
    let network = Network::build(props(10, 3), StrategyKind::NConnected).unwrap();
    let effect = network
        .predict(&Action::MirrorChange { target: 8 })
        .unwrap();
    assert_eq!(effect.latency, 0);
    assert!(effect.delta_active_links < 0.0);
}

#[test]
fn link_only_changes_pay_activation_latency() {
    let network = Network::build(props(10, 3), StrategyKind::NConnected).unwrap();
    let effect = network
        .predict(&Action::TargetLinkChange { links_per_mirror: 4 })
        .unwrap();
    assert_eq!(effect.latency, 2);

    let effect = network
        .predict(&Action::TopologyChange {
            kind: StrategyKind::Ring,
        })
        .unwrap();
    assert_eq!(effect.latency, 2);
}

#[test]
fn target_link_change_is_neutral_for_degree_free_topologies() {
    // A balanced tree keeps m - 1 links whatever the branching.
    let network = Network::build(props(10, 3), StrategyKind::BalancedTree).unwrap();
    let effect = network
        .predict(&Action::TargetLinkChange { links_per_mirror: 5 })
        .unwrap();
    assert_eq!(effect.delta_active_links, 0.0);
    assert_eq!(effect.delta_bandwidth, 0);
}

#[test]
fn going_fully_connected_reports_the_saturated_write_gain() {
    let network = Network::build(props(10, 3), StrategyKind::BalancedTree).unwrap();
    let effect = network
        .predict(&Action::TopologyChange {
            kind: StrategyKind::FullyConnected,
        })
        .unwrap();
    assert_eq!(effect.delta_time_to_write, 20);
    // 9 links to 45 links more than doubles the target; the ratio
    // clamps at +1.
    assert_eq!(effect.delta_active_links, 1.0);
}

#[test]
fn missing_max_bandwidth_fails_fast_with_the_key_name() {
    // Same table as `props`, minus max_bandwidth.
    let raw = r"
        startup_time_min = 1
        startup_time_max = 3
        ready_time_min = 1
        ready_time_max = 2
        stop_time_min = 1
        stop_time_max = 2
        link_activation_time_min = 1
        link_activation_time_max = 2
        link_bandwidth = 32
        file_size = 64
        num_mirrors = 10
        num_links_per_mirror = 3
        seed = 5
        sim_time = 30
    ";
    let table = SimProperties::from_table(raw.parse().unwrap());
    let network = Network::build(table, StrategyKind::BalancedTree).unwrap();
    let err = network
        .predict(&Action::MirrorChange { target: 12 })
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey(key) if key == "max_bandwidth"));
}

#[test]
fn impossible_hypothetical_plans_predict_no_change() {
    // Shrinking a ring below three cannot be planned; the predictor
    // reports a zero link delta instead of failing.
    let network = Network::build(props(5, 2), StrategyKind::Ring).unwrap();
    let effect = network
        .predict(&Action::MirrorChange { target: 2 })
        .unwrap();
    assert_eq!(effect.delta_active_links, 0.0);
    assert_eq!(effect.latency, 0);
}
