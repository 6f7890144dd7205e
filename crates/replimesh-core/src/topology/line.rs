//! Line topology: a simple path with exactly two endpoints.
//!
//! Growth alternates between the two ends: each new mirror attaches to
//! the end that has grown less so far, with ties broken toward the
//! endpoint carrying the lower mirror id.

use std::collections::VecDeque;

use replimesh_types::{LinkId, MirrorId, StructureType};

use crate::error::{Result, TopologyError};
use crate::fleet::Fleet;

use super::node::NodeArena;
use super::{StrategyKind, TopologyStrategy, build_order};

pub struct LineTopology {
    nodes: NodeArena,
    /// Path order, head first.
    order: VecDeque<MirrorId>,
    front_grown: u64,
    back_grown: u64,
}

impl LineTopology {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
            order: VecDeque::new(),
            front_grown: 0,
            back_grown: 0,
        }
    }

    fn too_few(mirrors: usize) -> TopologyError {
        TopologyError::InvalidMirrorDistribution {
            total: mirrors,
            ring_mirrors: 0,
            star_mirrors: 0,
            reason: "a line needs at least two mirrors".to_string(),
        }
    }
}

impl Default for LineTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStrategy for LineTopology {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Line
    }

    fn planned_link_count(&self, mirrors: usize, _links_per_mirror: usize) -> Result<u64> {
        if mirrors < 2 {
            return Err(Self::too_few(mirrors));
        }
        Ok(mirrors as u64 - 1)
    }

    fn build(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        let order = build_order(fleet);
        self.planned_link_count(order.len(), 0)?;

        self.nodes.clear();
        self.order = order.iter().copied().collect();
        self.front_grown = 0;
        self.back_grown = 0;

        let head = self.nodes.alloc(StructureType::Line, order[0]);
        self.nodes.set_root(head)?;
        let mut links = Vec::new();
        let mut previous_node = head;
        for pair in order.windows(2) {
            let node = self.nodes.alloc(StructureType::Line, pair[1]);
            self.nodes.adopt(previous_node, node);
            previous_node = node;
            links.push(fleet.create_link(pair[0], pair[1], tick)?);
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
            let (front, back) = match (self.order.front(), self.order.back()) {
                (Some(&f), Some(&b)) => (f, b),
                _ => return Err(Self::too_few(self.order.len())),
            };
            let at_front = match self.front_grown.cmp(&self.back_grown) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => front < back,
            };
            let endpoint = if at_front { front } else { back };

            let mirror = fleet.create_mirror(tick);
            fleet.create_link(endpoint, mirror, tick)?;

            let endpoint_node = self.nodes.find_by_mirror(endpoint).ok_or_else(|| {
                TopologyError::InvariantViolation {
                    structure: StructureType::Line,
                    detail: format!("line endpoint {endpoint} has no structure node"),
                }
            })?;
            let node = self.nodes.alloc(StructureType::Line, mirror);
            self.nodes.adopt(endpoint_node, node);

            if at_front {
                self.order.push_front(mirror);
                self.front_grown += 1;
            } else {
                self.order.push_back(mirror);
                self.back_grown += 1;
            }
        }
        Ok(())
    }

    fn remove_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        let live = fleet.live_mirror_count();
        self.planned_link_count(live.saturating_sub(count), 0)?;
        let root = fleet.root_id();
        for _ in 0..count {
            // Endpoints come off first; the path stays intact without
            // any splice. The root end is left alone.
            let victim = if self.order.back().copied() != root {
                self.order.pop_back()
            } else {
                self.order.pop_front()
            };
            let Some(victim) = victim else {
                return Err(Self::too_few(0));
            };
            fleet.shutdown_mirror(victim, tick);
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

#[cfg(test)]
mod tests {
    use replimesh_config::{DurationRange, TimingConfig};

    use super::*;

    fn fleet_with(mirrors: usize) -> Fleet {
        let timing = TimingConfig {
            startup: DurationRange::new(0, 0),
            ready: DurationRange::new(0, 0),
            stop: DurationRange::new(0, 0),
            link_activation: DurationRange::new(0, 0),
            link_bandwidth: 1,
            fault_probability: 0.0,
        };
        let mut fleet = Fleet::new(timing, 0, 16, 2);
        for _ in 0..mirrors {
            fleet.create_mirror(0);
        }
        fleet
    }

    fn degrees(fleet: &Fleet) -> Vec<usize> {
        let mut d: Vec<usize> = fleet.mirrors().map(|m| m.link_count()).collect();
        d.sort_unstable();
        d
    }

    #[test]
    fn path_has_two_endpoints() {
        let mut fleet = fleet_with(5);
        let mut strategy = LineTopology::new();
        let links = strategy.build(&mut fleet, 0).unwrap();

        assert_eq!(links.len(), 4);
        assert_eq!(degrees(&fleet), vec![1, 1, 2, 2, 2]);
    }

    #[test]
    fn growth_alternates_between_the_ends() {
        let mut fleet = fleet_with(3);
        let mut strategy = LineTopology::new();
        strategy.build(&mut fleet, 0).unwrap();

        strategy.add_mirrors(&mut fleet, 4, 1).unwrap();
        assert_eq!(strategy.front_grown, 2);
        assert_eq!(strategy.back_grown, 2);
        assert_eq!(degrees(&fleet), vec![1, 1, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn shrink_trims_endpoints_and_spares_the_root() {
        let mut fleet = fleet_with(5);
        let mut strategy = LineTopology::new();
        strategy.build(&mut fleet, 0).unwrap();

        strategy.remove_mirrors(&mut fleet, 3, 1).unwrap();
        let root = fleet.root_id().unwrap();
        assert!(!fleet.mirror(root).unwrap().state().is_stopping_or_stopped());
        assert_eq!(fleet.live_mirror_count(), 2);
    }

    #[test]
    fn single_mirror_line_is_rejected() {
        let mut fleet = fleet_with(1);
        let mut strategy = LineTopology::new();
        assert!(strategy.build(&mut fleet, 0).is_err());
    }
}
