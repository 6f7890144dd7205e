//! Star topology: one centre, every other mirror a direct leaf.

use replimesh_types::{LinkId, MirrorId, StructureType};

use crate::error::{Result, TopologyError};
use crate::fleet::Fleet;

use super::node::NodeArena;
use super::{StrategyKind, TopologyStrategy, build_order, shutdown_victims};

/// Centre plus at least two leaves.
const MIN_STAR: usize = 3;

pub struct StarTopology {
    nodes: NodeArena,
    centre: Option<MirrorId>,
}

impl StarTopology {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
            centre: None,
        }
    }

    pub fn centre(&self) -> Option<MirrorId> {
        self.centre
    }
}

impl Default for StarTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStrategy for StarTopology {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Star
    }

    fn planned_link_count(&self, mirrors: usize, _links_per_mirror: usize) -> Result<u64> {
        if mirrors < MIN_STAR {
            return Err(TopologyError::InvalidMirrorDistribution {
                total: mirrors,
                ring_mirrors: 0,
                star_mirrors: mirrors,
                reason: format!("a star needs at least {MIN_STAR} mirrors"),
            });
        }
        Ok(mirrors as u64 - 1)
    }

    fn build(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        let order = build_order(fleet);
        self.planned_link_count(order.len(), 0)?;

        self.nodes.clear();
        self.centre = Some(order[0]);
        let centre_node = self.nodes.alloc(StructureType::Star, order[0]);
        self.nodes.set_root(centre_node)?;

        let mut links = Vec::new();
        for &leaf in &order[1..] {
            let node = self.nodes.alloc(StructureType::Star, leaf);
            self.nodes.adopt(centre_node, node);
            links.push(fleet.create_link(order[0], leaf, tick)?);
        }
        Ok(links)
    }

    fn add_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        let Some(centre) = self.centre else {
            for _ in 0..count {
                fleet.create_mirror(tick);
            }
            return self.build(fleet, tick).map(|_| ());
        };
        let centre_node =
            self.nodes
                .find_by_mirror(centre)
                .ok_or_else(|| TopologyError::InvariantViolation {
                    structure: StructureType::Star,
                    detail: format!("star centre {centre} has no structure node"),
                })?;
        for _ in 0..count {
            let leaf = fleet.create_mirror(tick);
            fleet.create_link(centre, leaf, tick)?;
            let node = self.nodes.alloc(StructureType::Star, leaf);
            self.nodes.adopt(centre_node, node);
        }
        Ok(())
    }

    fn remove_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        let live = fleet.live_mirror_count();
        self.planned_link_count(live.saturating_sub(count), 0)?;
        for victim in shutdown_victims(fleet, count) {
            fleet.shutdown_mirror(victim, tick);
            self.forget_mirror(victim);
        }
        Ok(())
    }

    fn forget_mirror(&mut self, id: MirrorId) {
        if self.centre == Some(id) {
            self.centre = None;
        }
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

    #[test]
    fn root_is_the_centre() {
        let mut fleet = fleet_with(6);
        let mut strategy = StarTopology::new();
        let links = strategy.build(&mut fleet, 0).unwrap();

        assert_eq!(links.len(), 5);
        assert_eq!(strategy.centre(), fleet.root_id());
        let centre = strategy.centre().unwrap();
        assert_eq!(fleet.mirror(centre).unwrap().link_count(), 5);
    }

    #[test]
    fn leaves_have_degree_one() {
        let mut fleet = fleet_with(6);
        let mut strategy = StarTopology::new();
        strategy.build(&mut fleet, 0).unwrap();

        for mirror in fleet.mirrors() {
            if Some(mirror.id()) != strategy.centre() {
                assert_eq!(mirror.link_count(), 1);
            }
        }
    }

    #[test]
    fn growth_adds_leaves() {
        let mut fleet = fleet_with(3);
        let mut strategy = StarTopology::new();
        strategy.build(&mut fleet, 0).unwrap();

        strategy.add_mirrors(&mut fleet, 3, 1).unwrap();
        let centre = strategy.centre().unwrap();
        assert_eq!(fleet.mirror(centre).unwrap().link_count(), 5);
    }

    #[test]
    fn two_mirrors_are_not_a_star() {
        let mut fleet = fleet_with(2);
        let mut strategy = StarTopology::new();
        assert!(strategy.build(&mut fleet, 0).is_err());
    }
}
