//! Invariant checkers for simulation runs.
//!
//! Checkers continuously verify correctness properties against the
//! network after each tick. A violation stops the run immediately with
//! the checker's name and context.
//!
//! Structural checkers only consider links whose endpoints are both
//! live: a mirror that is still draining its stop timer keeps its links
//! open until it actually stops, and those edges are not part of the
//! maintained topology anymore.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use replimesh_core::Network;
use replimesh_core::StrategyKind;
use replimesh_types::{MirrorId, MirrorState};

// ============================================================================
// Invariant Result
// ============================================================================

/// Result of an invariant check.
#[derive(Debug, Clone)]
pub enum InvariantResult {
    /// The invariant holds.
    Ok,
    /// The invariant is violated.
    Violated {
        /// Name of the violated invariant.
        invariant: String,
        /// Description of the violation.
        message: String,
        /// Additional context.
        context: Vec<(String, String)>,
    },
}

impl InvariantResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, InvariantResult::Ok)
    }

    fn violated(invariant: &str, message: String) -> Self {
        InvariantResult::Violated {
            invariant: invariant.to_string(),
            message,
            context: Vec::new(),
        }
    }
}

/// Trait for invariant checkers.
pub trait InvariantChecker {
    fn name(&self) -> &'static str;

    /// Checks the network after a tick.
    fn check(&mut self, network: &Network, tick: u64) -> InvariantResult;

    /// Resets the checker to its initial state.
    fn reset(&mut self);
}

// ============================================================================
// Adjacency helper
// ============================================================================

/// Live-mirror adjacency over links whose endpoints are both live.
fn live_adjacency(network: &Network) -> BTreeMap<MirrorId, BTreeSet<MirrorId>> {
    let fleet = network.fleet();
    let live: BTreeSet<MirrorId> = fleet.live_mirror_ids().into_iter().collect();
    let mut adjacency: BTreeMap<MirrorId, BTreeSet<MirrorId>> =
        live.iter().map(|&id| (id, BTreeSet::new())).collect();
    for link in fleet.links() {
        if link.state().is_closed() {
            continue;
        }
        let (a, b) = link.endpoints();
        if live.contains(&a) && live.contains(&b) {
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }
    }
    adjacency
}

fn connected_component_size(adjacency: &BTreeMap<MirrorId, BTreeSet<MirrorId>>) -> usize {
    let Some((&start, _)) = adjacency.iter().next() else {
        return 0;
    };
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        if let Some(neighbours) = adjacency.get(&id) {
            for &n in neighbours {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
    }
    seen.len()
}

// ============================================================================
// State Monotonicity
// ============================================================================

/// No mirror ever transitions backward; `Stopped` is absorbing and a
/// removed mirror never reappears.
#[derive(Debug, Default)]
pub struct StateMonotonicityChecker {
    last_seen: HashMap<MirrorId, MirrorState>,
    departed: HashSet<MirrorId>,
}

impl StateMonotonicityChecker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InvariantChecker for StateMonotonicityChecker {
    fn name(&self) -> &'static str {
        "state_monotonicity"
    }

    fn check(&mut self, network: &Network, _tick: u64) -> InvariantResult {
        let mut present = HashSet::new();
        for mirror in network.fleet().mirrors() {
            let id = mirror.id();
            present.insert(id);
            if self.departed.contains(&id) {
                return InvariantResult::violated(
                    self.name(),
                    format!("mirror {id} reappeared after removal"),
                );
            }
            if let Some(&previous) = self.last_seen.get(&id) {
                if mirror.state() < previous {
                    return InvariantResult::violated(
                        self.name(),
                        format!(
                            "mirror {id} moved backward from {previous} to {}",
                            mirror.state()
                        ),
                    );
                }
            }
            self.last_seen.insert(id, mirror.state());
        }
        for (&id, _) in &self.last_seen {
            if !present.contains(&id) {
                self.departed.insert(id);
            }
        }
        InvariantResult::Ok
    }

    fn reset(&mut self) {
        self.last_seen.clear();
        self.departed.clear();
    }
}

// ============================================================================
// Link Symmetry & Pair Uniqueness
// ============================================================================

/// Every open link is in exactly its two endpoints' link sets, and no
/// two open links share an unordered endpoint pair.
#[derive(Debug, Default)]
pub struct LinkSymmetryChecker;

impl LinkSymmetryChecker {
    pub fn new() -> Self {
        Self
    }
}

impl InvariantChecker for LinkSymmetryChecker {
    fn name(&self) -> &'static str {
        "link_symmetry"
    }

    fn check(&mut self, network: &Network, _tick: u64) -> InvariantResult {
        let fleet = network.fleet();
        let mut pairs = HashSet::new();
        for link in fleet.links() {
            let (a, b) = link.endpoints();
            if link.state().is_closed() {
                // A closed link must be attached to neither endpoint.
                for end in [a, b] {
                    if let Some(mirror) = fleet.mirror(end) {
                        if mirror.links().contains(&link.id()) {
                            return InvariantResult::violated(
                                self.name(),
                                format!("closed link {} still attached to mirror {end}", link.id()),
                            );
                        }
                    }
                }
                continue;
            }
            let key = (a.min(b), a.max(b));
            if !pairs.insert(key) {
                return InvariantResult::violated(
                    self.name(),
                    format!("duplicate open link between {a} and {b}"),
                );
            }
            for end in [a, b] {
                let attached = fleet
                    .mirror(end)
                    .is_some_and(|m| m.links().contains(&link.id()));
                if !attached {
                    return InvariantResult::violated(
                        self.name(),
                        format!("open link {} missing from mirror {end}", link.id()),
                    );
                }
            }
        }
        // And the reverse direction: no mirror references a vanished or
        // closed link.
        for mirror in fleet.mirrors() {
            for &link_id in mirror.links() {
                let open = fleet.link(link_id).is_some_and(|l| !l.state().is_closed());
                if !open {
                    return InvariantResult::violated(
                        self.name(),
                        format!("mirror {} references dead link {link_id}", mirror.id()),
                    );
                }
            }
        }
        InvariantResult::Ok
    }

    fn reset(&mut self) {}
}

// ============================================================================
// Root Preservation
// ============================================================================

/// The root mirror never stops.
#[derive(Debug, Default)]
pub struct RootPreservationChecker;

impl RootPreservationChecker {
    pub fn new() -> Self {
        Self
    }
}

impl InvariantChecker for RootPreservationChecker {
    fn name(&self) -> &'static str {
        "root_preservation"
    }

    fn check(&mut self, network: &Network, _tick: u64) -> InvariantResult {
        let fleet = network.fleet();
        let Some(root) = fleet.root_id() else {
            return InvariantResult::violated(self.name(), "fleet has no root".to_string());
        };
        match fleet.mirror(root) {
            Some(mirror) if !mirror.state().is_stopping_or_stopped() => InvariantResult::Ok,
            Some(mirror) => InvariantResult::violated(
                self.name(),
                format!("root mirror {root} is {}", mirror.state()),
            ),
            None => InvariantResult::violated(
                self.name(),
                format!("root mirror {root} left the fleet"),
            ),
        }
    }

    fn reset(&mut self) {}
}

// ============================================================================
// Structural Topology
// ============================================================================

/// Per-strategy structural shape over the live subgraph. Only meaningful
/// for runs without random faults; crash degradation is intentionally
/// not repaired.
#[derive(Debug, Default)]
pub struct TopologyShapeChecker;

impl TopologyShapeChecker {
    pub fn new() -> Self {
        Self
    }
}

impl InvariantChecker for TopologyShapeChecker {
    fn name(&self) -> &'static str {
        "topology_shape"
    }

    fn check(&mut self, network: &Network, _tick: u64) -> InvariantResult {
        let adjacency = live_adjacency(network);
        let mirrors = adjacency.len();
        let links: usize = adjacency.values().map(BTreeSet::len).sum::<usize>() / 2;

        match network.strategy_kind() {
            StrategyKind::BalancedTree | StrategyKind::Line | StrategyKind::Star => {
                if links != mirrors.saturating_sub(1) {
                    return InvariantResult::violated(
                        self.name(),
                        format!(
                            "tree shape expects {} links, found {links}",
                            mirrors.saturating_sub(1)
                        ),
                    );
                }
                if mirrors > 0 && connected_component_size(&adjacency) != mirrors {
                    return InvariantResult::violated(
                        self.name(),
                        "tree shape is disconnected".to_string(),
                    );
                }
                // |E| = |V| - 1 and connected implies acyclic.
            }
            StrategyKind::Ring => {
                if links != mirrors {
                    return InvariantResult::violated(
                        self.name(),
                        format!("ring expects {mirrors} links, found {links}"),
                    );
                }
                for (id, neighbours) in &adjacency {
                    if neighbours.len() != 2 {
                        return InvariantResult::violated(
                            self.name(),
                            format!("ring mirror {id} has degree {}", neighbours.len()),
                        );
                    }
                }
                if mirrors > 0 && connected_component_size(&adjacency) != mirrors {
                    return InvariantResult::violated(
                        self.name(),
                        "ring splits into multiple cycles".to_string(),
                    );
                }
            }
            StrategyKind::FullyConnected => {
                let expected = mirrors * mirrors.saturating_sub(1) / 2;
                if links != expected {
                    return InvariantResult::violated(
                        self.name(),
                        format!("clique expects {expected} links, found {links}"),
                    );
                }
            }
            StrategyKind::NConnected | StrategyKind::Snowflake => {
                // Shape is plan-driven; the target figure is checked by
                // the link probe instead.
            }
        }
        InvariantResult::Ok
    }

    fn reset(&mut self) {}
}

// ============================================================================
// Data Conservation
// ============================================================================

/// `received <= size` always, and a complete package pins the mirror at
/// `HasData` until shutdown.
#[derive(Debug, Default)]
pub struct DataConservationChecker {
    completed: HashSet<MirrorId>,
}

impl DataConservationChecker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InvariantChecker for DataConservationChecker {
    fn name(&self) -> &'static str {
        "data_conservation"
    }

    fn check(&mut self, network: &Network, _tick: u64) -> InvariantResult {
        for mirror in network.fleet().mirrors() {
            let id = mirror.id();
            let Some(package) = mirror.data() else {
                if mirror.received() != 0 {
                    return InvariantResult::violated(
                        self.name(),
                        format!("mirror {id} has receipts but no package"),
                    );
                }
                continue;
            };
            if package.received() > package.size() {
                return InvariantResult::violated(
                    self.name(),
                    format!(
                        "mirror {id} received {} of {} units",
                        package.received(),
                        package.size()
                    ),
                );
            }
            if mirror.state() == MirrorState::HasData && !package.is_complete() {
                return InvariantResult::violated(
                    self.name(),
                    format!("mirror {id} claims has-data with an incomplete package"),
                );
            }
            if self.completed.contains(&id)
                && mirror.state() < MirrorState::HasData
                && !mirror.state().is_stopping_or_stopped()
            {
                return InvariantResult::violated(
                    self.name(),
                    format!("mirror {id} regressed out of has-data"),
                );
            }
            if mirror.state() == MirrorState::HasData {
                self.completed.insert(id);
            }
        }
        InvariantResult::Ok
    }

    fn reset(&mut self) {
        self.completed.clear();
    }
}

// ============================================================================
// Suite
// ============================================================================

/// The default checker suite run by `verify` mode and the tests.
pub struct InvariantSuite {
    checkers: Vec<Box<dyn InvariantChecker>>,
}

impl InvariantSuite {
    /// All checkers, including the structural shape checker (sound only
    /// without random faults).
    pub fn full() -> Self {
        Self {
            checkers: vec![
                Box::new(StateMonotonicityChecker::new()),
                Box::new(LinkSymmetryChecker::new()),
                Box::new(RootPreservationChecker::new()),
                Box::new(TopologyShapeChecker::new()),
                Box::new(DataConservationChecker::new()),
            ],
        }
    }

    /// Checkers that stay sound under random crash injection.
    pub fn fault_tolerant() -> Self {
        Self {
            checkers: vec![
                Box::new(StateMonotonicityChecker::new()),
                Box::new(LinkSymmetryChecker::new()),
                Box::new(RootPreservationChecker::new()),
                Box::new(DataConservationChecker::new()),
            ],
        }
    }

    /// Runs every checker; returns the first violation.
    pub fn check_all(&mut self, network: &Network, tick: u64) -> InvariantResult {
        for checker in &mut self.checkers {
            let result = checker.check(network, tick);
            if !result.is_ok() {
                return result;
            }
        }
        InvariantResult::Ok
    }

    pub fn reset(&mut self) {
        for checker in &mut self.checkers {
            checker.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_report_their_state() {
        assert!(InvariantResult::Ok.is_ok());
        assert!(!InvariantResult::violated("x", "boom".to_string()).is_ok());
    }
}
