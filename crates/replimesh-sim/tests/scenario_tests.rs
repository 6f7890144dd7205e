//! End-to-end scenario tests over the deterministic driver.

use replimesh_config::SimProperties;
use replimesh_core::{Action, Network, NetworkError, StrategyKind, TopologyError};
use replimesh_sim::{InvariantSuite, ScenarioType, Simulation};
use replimesh_types::MirrorState;

fn props(mirrors: u64, k: u64, ticks: u64) -> SimProperties {
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
        seed = 11
        sim_time = {ticks}
        "
    );
    SimProperties::from_table(toml.parse().expect("test config parses"))
}

#[test]
fn tree_baseline_settles_into_a_full_tree() {
    let mut sim = Simulation::from_scenario(ScenarioType::TreeBaseline, 11)
        .unwrap()
        .with_invariants(InvariantSuite::full());
    let summary = sim.run().unwrap();

    assert_eq!(summary.live_mirrors, 10);
    assert_eq!(summary.active_links, 9);
    assert_eq!(summary.target_links, 9);
    // The payload reached every mirror.
    assert_eq!(summary.mirrors_with_data, 10);
    for mirror in sim.network().fleet().mirrors() {
        assert_eq!(mirror.state(), MirrorState::HasData);
    }
}

#[test]
fn tree_growth_doubles_the_fleet_and_stays_a_tree() {
    let mut sim = Simulation::from_scenario(ScenarioType::TreeGrowth, 11)
        .unwrap()
        .with_invariants(InvariantSuite::full());

    sim.run_until(9).unwrap();
    assert_eq!(sim.network().fleet().live_mirror_count(), 10);

    sim.run_until(30).unwrap();
    assert_eq!(sim.network().fleet().live_mirror_count(), 20);
    assert_eq!(sim.network().fleet().active_link_count(), 19);
    assert_eq!(sim.network().target_link_count(), 19);

    sim.run().unwrap();
}

#[test]
fn full_mesh_converges_to_all_pairs_active() {
    let mut sim = Simulation::from_scenario(ScenarioType::FullMeshConvergence, 11)
        .unwrap()
        .with_invariants(InvariantSuite::full());
    let summary = sim.run().unwrap();

    assert_eq!(summary.live_mirrors, 10);
    assert_eq!(summary.active_links, 45);
    assert_eq!(summary.target_links, 45);
}

#[test]
fn ring_insertion_grows_the_cycle_to_six() {
    let mut sim = Simulation::from_scenario(ScenarioType::RingInsertion, 11)
        .unwrap()
        .with_invariants(InvariantSuite::full());
    let summary = sim.run().unwrap();

    assert_eq!(summary.live_mirrors, 6);
    assert_eq!(summary.active_links, 6);
    for mirror in sim.network().fleet().mirrors() {
        assert_eq!(mirror.link_count(), 2, "mirror {}", mirror.id());
    }
}

#[test]
fn faulty_ring_never_breaks_the_fault_tolerant_suite() {
    let mut sim = Simulation::from_scenario(ScenarioType::FaultyRing, 23)
        .unwrap()
        .with_invariants(InvariantSuite::fault_tolerant());
    let summary = sim.run().unwrap();

    // The root survives whatever the crash sampler does.
    let root = sim.network().fleet().root_id().unwrap();
    assert!(
        !sim.network()
            .fleet()
            .mirror(root)
            .unwrap()
            .state()
            .is_stopping_or_stopped()
    );
    assert!(summary.live_mirrors <= 12);
}

#[test]
fn scheduled_shrink_applies_and_pre_wires_the_ring() {
    let mut sim =
        Simulation::from_props(props(8, 2, 40), StrategyKind::Ring).unwrap();
    sim.schedule(Action::MirrorChange { target: 5 }, 12);
    sim.run_until(11).unwrap();
    assert_eq!(sim.network().fleet().live_mirror_count(), 8);

    sim.run().unwrap();
    assert_eq!(sim.network().fleet().live_mirror_count(), 5);
    assert_eq!(sim.network().fleet().active_link_count(), 5);
}

#[test]
fn topology_round_trip_satisfies_the_new_invariant() {
    // Ring to star and back to a tree: each swap must land in a graph
    // the destination strategy recognises as its own.
    let mut sim = Simulation::from_props(props(9, 3, 60), StrategyKind::Ring).unwrap();
    sim.schedule(
        Action::TopologyChange {
            kind: StrategyKind::Star,
        },
        10,
    );
    sim.schedule(
        Action::TopologyChange {
            kind: StrategyKind::BalancedTree,
        },
        30,
    );

    sim.run_until(25).unwrap();
    assert_eq!(sim.network().strategy_kind(), StrategyKind::Star);
    assert_eq!(sim.network().fleet().active_link_count(), 8);

    sim.run().unwrap();
    assert_eq!(sim.network().strategy_kind(), StrategyKind::BalancedTree);
    assert_eq!(sim.network().fleet().active_link_count(), 8);

    let mut suite = InvariantSuite::full();
    assert!(
        suite
            .check_all(sim.network(), sim.network().current_tick())
            .is_ok()
    );
}

#[test]
fn snowflake_validator_accepts_ten_and_rejects_two() {
    let mut accept = props(10, 3, 20);
    accept.set("minimal_ring_mirror_count", 3);
    accept.set("max_ring_layers", 2);
    accept.set("extern_star_ratio", 0.3);
    assert!(Network::build(accept, StrategyKind::Snowflake).is_ok());

    let mut reject = props(2, 3, 20);
    reject.set("minimal_ring_mirror_count", 3);
    reject.set("max_ring_layers", 2);
    reject.set("extern_star_ratio", 0.3);
    match Network::build(reject, StrategyKind::Snowflake) {
        Err(NetworkError::Topology(TopologyError::InsufficientMirrorsForRing {
            available,
            required,
            ring,
        })) => {
            assert_eq!(available, 2);
            assert_eq!(required, 3);
            assert_eq!(ring, 1);
        }
        other => panic!("expected a ring validation error, got {other:?}"),
    }
}

#[test]
fn snowflake_runs_end_to_end() {
    let mut table = props(24, 3, 60);
    table.set("minimal_ring_mirror_count", 3);
    table.set("max_ring_layers", 2);
    table.set("ring_bridge_step", 2);
    table.set("extern_star_ratio", 0.25);
    table.set("extern_star_max_tree_depth", 2);
    let mut sim = Simulation::from_props(table, StrategyKind::Snowflake)
        .unwrap()
        .with_invariants(InvariantSuite::full());
    let summary = sim.run().unwrap();

    assert_eq!(summary.live_mirrors, 24);
    assert_eq!(summary.active_links as u64, summary.target_links);
    assert_eq!(summary.mirrors_with_data, 24);
}

#[test]
fn ring_shrink_below_minimum_fails_without_mutation() {
    let mut sim = Simulation::from_props(props(5, 2, 20), StrategyKind::Ring).unwrap();
    sim.run_until(5).unwrap();
    let err = sim.network_mut().set_target_mirror_count(2, 6);
    assert!(matches!(
        err,
        Err(NetworkError::Topology(
            TopologyError::InsufficientMirrorsForRing { .. }
        ))
    ));
    assert_eq!(sim.network().fleet().live_mirror_count(), 5);
    assert_eq!(sim.network().fleet().open_link_count(), 5);
}
