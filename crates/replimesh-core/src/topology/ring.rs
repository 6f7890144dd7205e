//! Ring topology: a single undirected cycle.
//!
//! Growth inserts the new mirror directly after the lowest-id member;
//! planned shrink closes the victim's two cycle links and pre-wires the
//! bypass between its neighbours, so the cycle is whole again the moment
//! the victim leaves the fleet.

use replimesh_types::{LinkId, MirrorId, StructureType};

use crate::error::{Result, TopologyError};
use crate::fleet::Fleet;

use super::node::NodeArena;
use super::{StrategyKind, TopologyStrategy, build_order};

/// Minimum cycle length.
const MIN_RING: usize = 3;

pub struct RingTopology {
    nodes: NodeArena,
    /// Cyclic member order; the successor of the last entry is the first.
    order: Vec<MirrorId>,
}

impl RingTopology {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
            order: Vec::new(),
        }
    }

    fn position_of(&self, mirror: MirrorId) -> Option<usize> {
        self.order.iter().position(|&m| m == mirror)
    }
}

impl Default for RingTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStrategy for RingTopology {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ring
    }

    fn planned_link_count(&self, mirrors: usize, _links_per_mirror: usize) -> Result<u64> {
        if mirrors < MIN_RING {
            return Err(TopologyError::InsufficientMirrorsForRing {
                available: mirrors,
                required: MIN_RING,
                ring: 0,
            });
        }
        Ok(mirrors as u64)
    }

    fn build(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        let order = build_order(fleet);
        self.planned_link_count(order.len(), 0)?;

        self.nodes.clear();
        self.order = order.clone();

        let head = self.nodes.alloc(StructureType::Ring, order[0]);
        self.nodes.set_root(head)?;
        let mut previous = head;
        for &mirror in &order[1..] {
            let node = self.nodes.alloc(StructureType::Ring, mirror);
            // "Children" on a ring are the successor in the cycle.
            self.nodes.adopt(previous, node);
            previous = node;
        }

        let mut links = Vec::new();
        for i in 0..order.len() {
            let a = order[i];
            let b = order[(i + 1) % order.len()];
            links.push(fleet.create_link(a, b, tick)?);
        }
        Ok(links)
    }

    fn add_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        if self.order.is_empty() {
            for _ in 0..count {
                fleet.create_mirror(tick);
            }
            return self.build(fleet, tick).map(|_| ());
        }
        for _ in 0..count {
            // Deterministic insertion point: after the lowest-id member.
            let (pos, anchor) = self
                .order
                .iter()
                .copied()
                .enumerate()
                .min_by_key(|&(_, m)| m)
                .ok_or_else(|| TopologyError::InsufficientMirrorsForRing {
                    available: 0,
                    required: MIN_RING,
                    ring: 0,
                })?;
            let successor = self.order[(pos + 1) % self.order.len()];

            let mirror = fleet.create_mirror(tick);
            if let Some(old) = fleet.link_between(anchor, successor) {
                fleet.close_link(old);
            }
            fleet.create_link(anchor, mirror, tick)?;
            fleet.create_link(mirror, successor, tick)?;
            self.order.insert(pos + 1, mirror);

            let anchor_node = self.nodes.find_by_mirror(anchor).ok_or_else(|| {
                TopologyError::InvariantViolation {
                    structure: StructureType::Ring,
                    detail: format!("ring member {anchor} has no structure node"),
                }
            })?;
            let node = self.nodes.alloc(StructureType::Ring, mirror);
            self.nodes.adopt(anchor_node, node);
        }
        Ok(())
    }

    fn remove_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        let live = fleet.live_mirror_count();
        self.planned_link_count(live.saturating_sub(count), 0)?;
        let root = fleet.root_id();
        for _ in 0..count {
            let victim = self
                .order
                .iter()
                .copied()
                .filter(|&m| Some(m) != root)
                .max()
                .ok_or_else(|| TopologyError::InsufficientMirrorsForRing {
                    available: self.order.len(),
                    required: MIN_RING,
                    ring: 0,
                })?;
            let pos = self.position_of(victim).unwrap_or(0);
            let prev = self.order[(pos + self.order.len() - 1) % self.order.len()];
            let next = self.order[(pos + 1) % self.order.len()];

            if let Some(link) = fleet.link_between(prev, victim) {
                fleet.close_link(link);
            }
            if let Some(link) = fleet.link_between(victim, next) {
                fleet.close_link(link);
            }
            // Pre-wire the bypass so the cycle holds once the victim
            // finishes stopping.
            if prev != next && fleet.link_between(prev, next).is_none() {
                fleet.create_link(prev, next, tick)?;
            }

            fleet.shutdown_mirror(victim, tick);
            self.order.remove(pos);
            if let Some(node) = self.nodes.find_by_mirror(victim) {
                self.nodes.remove(node);
            }
        }
        Ok(())
    }

    fn forget_mirror(&mut self, id: MirrorId) {
        self.order.retain(|&m| m != id);
        if let Some(node) = self.nodes.find_by_mirror(id) {
            self.nodes.remove(node);
        }
    }
}
