//! Balanced tree topology.
//!
//! Rooted tree grown breadth-first: each node fills up to the target
//! links-per-mirror children before the next depth starts. The fleet
//! root mirror is the tree root.

use replimesh_types::{LinkId, MirrorId, NodeId, StructureType};

use crate::error::{Result, TopologyError};
use crate::fleet::Fleet;

use super::node::NodeArena;
use super::{StrategyKind, TopologyStrategy, build_order};

pub struct BalancedTreeTopology {
    nodes: NodeArena,
}

impl BalancedTreeTopology {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
        }
    }

    /// First node in BFS order with room for another child.
    fn open_slot(&self, capacity: usize) -> Option<NodeId> {
        self.nodes
            .bfs_order()
            .into_iter()
            .find(|&id| self.nodes.child_count(id) < capacity)
    }

    fn attach(&mut self, fleet: &mut Fleet, mirror: MirrorId, tick: u64) -> Result<()> {
        let capacity = fleet.target_links_per_mirror().max(1);
        let parent = self.open_slot(capacity).ok_or_else(|| {
            TopologyError::InvariantViolation {
                structure: StructureType::Tree,
                detail: "no open slot in a rooted tree".to_string(),
            }
        })?;
        let node = self.nodes.alloc(StructureType::Tree, mirror);
        self.nodes.adopt(parent, node);
        let parent_mirror = self
            .nodes
            .node(parent)
            .and_then(super::node::StructureNode::mirror)
            .ok_or_else(|| TopologyError::InvariantViolation {
                structure: StructureType::Tree,
                detail: "tree node without a bound mirror".to_string(),
            })?;
        fleet.create_link(parent_mirror, mirror, tick)?;
        Ok(())
    }

    /// Deepest leaf with the highest mirror id; never the root.
    fn deepest_leaf(&self) -> Option<NodeId> {
        let root = self.nodes.root()?;
        let mut best: Option<(usize, MirrorId, NodeId)> = None;
        for (depth, id) in self.bfs_with_depth() {
            if id == root || self.nodes.child_count(id) > 0 {
                continue;
            }
            let mirror = self.nodes.node(id).and_then(super::node::StructureNode::mirror);
            let Some(mirror) = mirror else { continue };
            let candidate = (depth, mirror, id);
            if best.is_none_or(|b| (candidate.0, candidate.1) > (b.0, b.1)) {
                best = Some(candidate);
            }
        }
        best.map(|(_, _, id)| id)
    }

    fn bfs_with_depth(&self) -> Vec<(usize, NodeId)> {
        let mut out = Vec::new();
        let Some(root) = self.nodes.root() else {
            return out;
        };
        let mut queue = std::collections::VecDeque::from([(0usize, root)]);
        while let Some((depth, id)) = queue.pop_front() {
            out.push((depth, id));
            if let Some(node) = self.nodes.node(id) {
                queue.extend(node.children().iter().map(|&c| (depth + 1, c)));
            }
        }
        out
    }
}

impl Default for BalancedTreeTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStrategy for BalancedTreeTopology {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BalancedTree
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
        Ok(mirrors as u64 - 1)
    }

    fn build(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        let order = build_order(fleet);
        self.planned_link_count(order.len(), 0)?;

        self.nodes.clear();
        let root_node = self.nodes.alloc(StructureType::Tree, order[0]);
        self.nodes.set_root(root_node)?;

        let capacity = fleet.target_links_per_mirror().max(1);
        let mut links = Vec::new();
        let mut queue = std::collections::VecDeque::from([root_node]);
        for &mirror in &order[1..] {
            // Breadth-first fill: drop exhausted parents off the queue.
            while let Some(&front) = queue.front() {
                if self.nodes.child_count(front) < capacity {
                    break;
                }
                queue.pop_front();
            }
            let parent = *queue.front().ok_or_else(|| TopologyError::InvariantViolation {
                structure: StructureType::Tree,
                detail: "breadth-first queue exhausted".to_string(),
            })?;
            let node = self.nodes.alloc(StructureType::Tree, mirror);
            self.nodes.adopt(parent, node);
            queue.push_back(node);

            let parent_mirror = self
                .nodes
                .node(parent)
                .and_then(super::node::StructureNode::mirror)
                .ok_or_else(|| TopologyError::InvariantViolation {
                    structure: StructureType::Tree,
                    detail: "tree node without a bound mirror".to_string(),
                })?;
            links.push(fleet.create_link(parent_mirror, mirror, tick)?);
        }
        Ok(links)
    }

    fn add_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        if self.nodes.root().is_none() {
            for _ in 0..count {
                fleet.create_mirror(tick);
            }
            return self.build(fleet, tick).map(|_| ());
        }
        for _ in 0..count {
            let mirror = fleet.create_mirror(tick);
            self.attach(fleet, mirror, tick)?;
        }
        Ok(())
    }

    fn remove_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        let live = fleet.live_mirror_count();
        self.planned_link_count(live.saturating_sub(count), 0)?;
        for _ in 0..count {
            let leaf = self.deepest_leaf().ok_or_else(|| {
                TopologyError::InvalidMirrorDistribution {
                    total: live,
                    ring_mirrors: 0,
                    star_mirrors: 0,
                    reason: "no removable leaf remains".to_string(),
                }
            })?;
            if let Some(mirror) = self.nodes.node(leaf).and_then(super::node::StructureNode::mirror)
            {
                fleet.shutdown_mirror(mirror, tick);
            }
            self.nodes.remove(leaf);
        }
        Ok(())
    }

    fn forget_mirror(&mut self, id: MirrorId) {
        if let Some(node) = self.nodes.find_by_mirror(id) {
            self.nodes.remove(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use replimesh_config::{DurationRange, TimingConfig};

    use super::*;

    fn fleet_with(mirrors: usize, k: usize) -> Fleet {
        let timing = TimingConfig {
            startup: DurationRange::new(0, 0),
            ready: DurationRange::new(0, 0),
            stop: DurationRange::new(0, 0),
            link_activation: DurationRange::new(0, 0),
            link_bandwidth: 1,
            fault_probability: 0.0,
        };
        let mut fleet = Fleet::new(timing, 0, 16, k);
        for _ in 0..mirrors {
            fleet.create_mirror(0);
        }
        fleet
    }

    #[test]
    fn builds_m_minus_one_links() {
        let mut fleet = fleet_with(10, 3);
        let mut strategy = BalancedTreeTopology::new();
        let links = strategy.build(&mut fleet, 0).unwrap();
        assert_eq!(links.len(), 9);
    }

    #[test]
    fn breadth_first_fill_respects_the_branching_cap() {
        let mut fleet = fleet_with(10, 3);
        let mut strategy = BalancedTreeTopology::new();
        strategy.build(&mut fleet, 0).unwrap();

        // Root holds 3 children (degree 3); internal nodes at most 4.
        let root = fleet.root_id().unwrap();
        assert_eq!(fleet.mirror(root).unwrap().link_count(), 3);
        for mirror in fleet.mirrors() {
            assert!(mirror.link_count() <= 4);
        }
    }

    #[test]
    fn every_non_root_mirror_has_a_parent_path_to_the_root() {
        let mut fleet = fleet_with(10, 3);
        let mut strategy = BalancedTreeTopology::new();
        strategy.build(&mut fleet, 0).unwrap();

        // A BFS from the arena root must reach every node.
        assert_eq!(strategy.nodes.bfs_order().len(), 10);
    }

    #[test]
    fn growth_attaches_at_the_shallowest_open_slot() {
        let mut fleet = fleet_with(4, 3);
        let mut strategy = BalancedTreeTopology::new();
        strategy.build(&mut fleet, 0).unwrap();

        strategy.add_mirrors(&mut fleet, 6, 1).unwrap();
        assert_eq!(fleet.live_mirror_count(), 10);
        assert_eq!(fleet.open_link_count(), 9);
    }

    #[test]
    fn shrink_removes_deepest_leaves_first() {
        let mut fleet = fleet_with(10, 3);
        let mut strategy = BalancedTreeTopology::new();
        strategy.build(&mut fleet, 0).unwrap();

        strategy.remove_mirrors(&mut fleet, 3, 1).unwrap();
        assert_eq!(fleet.live_mirror_count(), 7);
        let root = fleet.root_id().unwrap();
        assert!(!fleet.mirror(root).unwrap().state().is_stopping_or_stopped());
    }
}
