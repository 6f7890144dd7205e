//! N-connected topology: a k-regular circulant (ring of chords).
//!
//! Mirrors sit on a circle in build order; each carries chords to its
//! nearest neighbours at offsets `1..=k/2`, plus diameter chords when
//! `k` is odd. When `m·k` is odd a perfectly regular graph does not
//! exist; the generator then lands on `ceil(m·k / 2)` links, preferring
//! the larger figure.

use std::collections::BTreeSet;

use replimesh_types::{LinkId, MirrorId, StructureType};

use crate::error::{Result, TopologyError};
use crate::fleet::Fleet;

use super::node::NodeArena;
use super::{StrategyKind, TopologyStrategy, build_order, shutdown_victims};

/// Deterministic chord set for `m` positions at degree `k`, as unordered
/// index pairs.
fn circulant_pairs(m: usize, k: usize) -> BTreeSet<(usize, usize)> {
    let mut pairs = BTreeSet::new();
    if m < 2 {
        return pairs;
    }
    let mut push = |i: usize, j: usize| {
        if i != j {
            pairs.insert((i.min(j), i.max(j)));
        }
    };
    for d in 1..=(k / 2).min(m / 2) {
        for i in 0..m {
            push(i, (i + d) % m);
        }
    }
    if k % 2 == 1 {
        let diameter = m / 2;
        for i in 0..m.div_ceil(2) {
            push(i, (i + diameter) % m);
        }
    }
    pairs
}

pub struct NConnectedTopology {
    nodes: NodeArena,
}

impl NConnectedTopology {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
        }
    }

    fn rebuild(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        let order = build_order(fleet);
        self.planned_link_count(order.len(), fleet.target_links_per_mirror())?;

        self.nodes.clear();
        let root_node = self.nodes.alloc(StructureType::Generic, order[0]);
        self.nodes.set_root(root_node)?;
        let mut previous = root_node;
        for &mirror in &order[1..] {
            let node = self.nodes.alloc(StructureType::Generic, mirror);
            self.nodes.adopt(previous, node);
            previous = node;
        }

        let mut links = Vec::new();
        for (i, j) in circulant_pairs(order.len(), fleet.target_links_per_mirror()) {
            links.push(fleet.create_link(order[i], order[j], tick)?);
        }
        Ok(links)
    }
}

impl Default for NConnectedTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStrategy for NConnectedTopology {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NConnected
    }

    fn planned_link_count(&self, mirrors: usize, links_per_mirror: usize) -> Result<u64> {
        if links_per_mirror == 0 {
            return Err(TopologyError::InvalidMirrorDistribution {
                total: mirrors,
                ring_mirrors: 0,
                star_mirrors: 0,
                reason: "links per mirror must be positive".to_string(),
            });
        }
        if mirrors <= links_per_mirror {
            return Err(TopologyError::InvalidMirrorDistribution {
                total: mirrors,
                ring_mirrors: 0,
                star_mirrors: 0,
                reason: format!(
                    "mirror count must exceed the {links_per_mirror} links per mirror"
                ),
            });
        }
        Ok(circulant_pairs(mirrors, links_per_mirror).len() as u64)
    }

    fn build(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        self.rebuild(fleet, tick)
    }

    // Membership changes re-plan the whole chord set; an incremental
    // splice cannot keep a circulant regular.
    fn add_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        self.planned_link_count(
            fleet.live_mirror_count() + count,
            fleet.target_links_per_mirror(),
        )?;
        for _ in 0..count {
            fleet.create_mirror(tick);
        }
        fleet.close_all_links();
        self.rebuild(fleet, tick)?;
        Ok(())
    }

    fn remove_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        let live = fleet.live_mirror_count();
        self.planned_link_count(
            live.saturating_sub(count),
            fleet.target_links_per_mirror(),
        )?;
        for victim in shutdown_victims(fleet, count) {
            fleet.shutdown_mirror(victim, tick);
        }
        fleet.close_all_links();
        self.rebuild(fleet, tick)?;
        Ok(())
    }

    fn forget_mirror(&mut self, id: MirrorId) {
        if let Some(node) = self.nodes.find_by_mirror(id) {
            self.nodes.remove(node);
        }
    }
}
