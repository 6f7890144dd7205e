//! Fully connected topology: every unordered pair of mirrors is linked.

use replimesh_types::{LinkId, MirrorId, StructureType};

use crate::error::{Result, TopologyError};
use crate::fleet::Fleet;

use super::node::NodeArena;
use super::{StrategyKind, TopologyStrategy, build_order, shutdown_victims};

pub struct FullyConnectedTopology {
    nodes: NodeArena,
}

impl FullyConnectedTopology {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
        }
    }
}

impl Default for FullyConnectedTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStrategy for FullyConnectedTopology {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FullyConnected
    }

    fn planned_link_count(&self, mirrors: usize, _links_per_mirror: usize) -> Result<u64> {
        if mirrors == 0 {
            return Err(TopologyError::InvalidMirrorDistribution {
                total: 0,
                ring_mirrors: 0,
                star_mirrors: 0,
                reason: "at least one mirror is required".to_string(),
            });
        }
        Ok((mirrors as u64 * (mirrors as u64 - 1)) / 2)
    }

    fn build(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        let order = build_order(fleet);
        self.planned_link_count(order.len(), 0)?;

        self.nodes.clear();
        let root_node = self.nodes.alloc(StructureType::Generic, order[0]);
        self.nodes.set_root(root_node)?;
        for &mirror in &order[1..] {
            let node = self.nodes.alloc(StructureType::Generic, mirror);
            self.nodes.adopt(root_node, node);
        }

        let mut links = Vec::new();
        for (i, &a) in order.iter().enumerate() {
            for &b in &order[i + 1..] {
                links.push(fleet.create_link(a, b, tick)?);
            }
        }
        Ok(links)
    }

    fn add_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        let root_node = match self.nodes.root() {
            Some(root) => root,
            None => return self.build(fleet, tick).map(|_| ()),
        };
        for _ in 0..count {
            let peers = fleet.live_mirror_ids();
            let id = fleet.create_mirror(tick);
            for peer in peers {
                fleet.create_link(id, peer, tick)?;
            }
            let node = self.nodes.alloc(StructureType::Generic, id);
            self.nodes.adopt(root_node, node);
        }
        Ok(())
    }

    fn remove_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        let live = fleet.live_mirror_count();
        if live.saturating_sub(count) < 1 {
            return Err(TopologyError::InvalidMirrorDistribution {
                total: live,
                ring_mirrors: 0,
                star_mirrors: 0,
                reason: format!("cannot remove {count} of {live} mirrors: the root must remain"),
            });
        }
        for victim in shutdown_victims(fleet, count) {
            fleet.shutdown_mirror(victim, tick);
            self.forget_mirror(victim);
        }
        Ok(())
    }

    fn forget_mirror(&mut self, id: MirrorId) {
        if let Some(node) = self.nodes.find_by_mirror(id) {
            self.nodes.remove(node);
        }
    }
}
