//! Snowflake topology: concentric rings joined by bridges, with
//! external star subtrees hanging off ports on the outermost ring.
//!
//! Construction is split into a pure planning phase and a materialise
//! phase. [`SnowflakePlan::compute`] does all validation and budgeting
//! without touching the fleet; the strategy then spends mirrors against
//! the plan in deterministic id order. The same plan function answers
//! the target-link-count queries, so prediction and construction can
//! never drift apart.
//!
//! Budgeting rules:
//! - mirrors split into a ring budget (`floor(m · (1 − ratio))`) and a
//!   star budget (the rest, odd spill included);
//! - rings are sized outside-in, remainder to the outermost, each at
//!   least `minimal_ring_mirror_count`;
//! - bridge chains carry exactly `bridge_height` intermediate mirrors,
//!   stolen from the innermost ring first; when the budget cannot cover
//!   the bridges of a layering, the layer count is reduced before the
//!   configuration is rejected;
//! - star ports sit every `ring_bridge_step + 1` positions around the
//!   outermost ring, each holding an optional approach chain and a
//!   depth-limited balanced subtree.

use replimesh_config::{SimProperties, keys};
use replimesh_types::{LinkId, MirrorId, NodeId, StructureType};

use crate::error::{NetworkError, Result, TopologyError};
use crate::fleet::Fleet;

use super::node::NodeArena;
use super::{StrategyKind, TopologyStrategy, build_order, shutdown_victims};

// ============================================================================
// Parameters
// ============================================================================

/// Shape knobs for the snowflake, validated at strategy construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowflakeParams {
    pub minimal_ring_mirror_count: usize,
    pub max_ring_layers: usize,
    pub ring_bridge_step: usize,
    pub ring_bridge_offset: usize,
    pub bridge_height: usize,
    pub extern_star_ratio: f64,
    pub extern_star_max_tree_depth: usize,
    pub bridge_to_extern_star_distance: usize,
}

impl Default for SnowflakeParams {
    fn default() -> Self {
        Self {
            minimal_ring_mirror_count: 3,
            max_ring_layers: 1,
            ring_bridge_step: 0,
            ring_bridge_offset: 0,
            bridge_height: 1,
            extern_star_ratio: 0.0,
            extern_star_max_tree_depth: 1,
            bridge_to_extern_star_distance: 0,
        }
    }
}

impl SnowflakeParams {
    /// Reads the knobs from the flat config table, falling back to the
    /// defaults for absent keys, then validates every constraint.
    pub fn from_props(props: &SimProperties) -> std::result::Result<Self, NetworkError> {
        let defaults = Self::default();
        let params = Self {
            minimal_ring_mirror_count: props.get_u64_or(
                keys::MINIMAL_RING_MIRROR_COUNT,
                defaults.minimal_ring_mirror_count as u64,
            )? as usize,
            max_ring_layers: props
                .get_u64_or(keys::MAX_RING_LAYERS, defaults.max_ring_layers as u64)?
                as usize,
            ring_bridge_step: props
                .get_u64_or(keys::RING_BRIDGE_STEP, defaults.ring_bridge_step as u64)?
                as usize,
            ring_bridge_offset: props
                .get_u64_or(keys::RING_BRIDGE_OFFSET, defaults.ring_bridge_offset as u64)?
                as usize,
            bridge_height: props
                .get_u64_or(keys::BRIDGE_HEIGHT, defaults.bridge_height as u64)?
                as usize,
            extern_star_ratio: props
                .get_f64_or(keys::EXTERN_STAR_RATIO, defaults.extern_star_ratio)?,
            extern_star_max_tree_depth: props.get_u64_or(
                keys::EXTERN_STAR_MAX_TREE_DEPTH,
                defaults.extern_star_max_tree_depth as u64,
            )? as usize,
            bridge_to_extern_star_distance: props.get_u64_or(
                keys::BRIDGE_TO_EXTERN_STAR_DISTANCE,
                defaults.bridge_to_extern_star_distance as u64,
            )? as usize,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks every knob against its documented constraint.
    pub fn validate(&self) -> Result<()> {
        if self.minimal_ring_mirror_count < 3 {
            return Err(TopologyError::InvalidRingParameter {
                parameter: "minimal_ring_mirror_count",
                actual: self.minimal_ring_mirror_count as i64,
                constraint: "must be at least 3",
            });
        }
        if self.max_ring_layers < 1 {
            return Err(TopologyError::InvalidRingParameter {
                parameter: "max_ring_layers",
                actual: self.max_ring_layers as i64,
                constraint: "must be at least 1",
            });
        }
        if self.bridge_height < 1 {
            return Err(TopologyError::InvalidRingParameter {
                parameter: "bridge_height",
                actual: self.bridge_height as i64,
                constraint: "must be at least 1",
            });
        }
        if !(0.0..=1.0).contains(&self.extern_star_ratio) {
            return Err(TopologyError::InvalidStarParameter {
                parameter: "extern_star_ratio",
                actual: self.extern_star_ratio,
                constraint: "must lie in [0, 1]",
            });
        }
        if self.extern_star_max_tree_depth < 1 {
            return Err(TopologyError::InvalidStarParameter {
                parameter: "extern_star_max_tree_depth",
                actual: self.extern_star_max_tree_depth as f64,
                constraint: "must be at least 1",
            });
        }
        Ok(())
    }
}

// ============================================================================
// Plan
// ============================================================================

/// One bridge between two adjacent ring layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSpec {
    /// Index of the outer ring of the pair (0 = outermost).
    pub outer_ring: usize,
    /// Position of the bridge port on the outer ring.
    pub outer_pos: usize,
    /// Position of the landing mirror on the inner ring.
    pub inner_pos: usize,
}

/// One star port on the outermost ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub outer_pos: usize,
    /// Approach-chain mirrors between port and subtree root.
    pub chain_len: usize,
    /// Subtree node count, root included.
    pub subtree_size: usize,
}

/// The fully budgeted shape for a given mirror count.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowflakePlan {
    /// Ring sizes, outermost first.
    pub ring_sizes: Vec<usize>,
    pub bridges: Vec<BridgeSpec>,
    pub ports: Vec<PortSpec>,
    pub link_count: u64,
    pub total_mirrors: usize,
}

/// Node capacity of a balanced subtree of the given branching and depth,
/// root included.
fn subtree_capacity(branching: usize, depth: usize) -> usize {
    if branching <= 1 {
        return depth;
    }
    let mut capacity = 0usize;
    let mut level = 1usize;
    for _ in 0..depth {
        capacity = capacity.saturating_add(level);
        level = level.saturating_mul(branching);
    }
    capacity
}

impl SnowflakePlan {
    /// Plans the snowflake for `mirrors` mirrors. Pure.
    pub fn compute(
        mirrors: usize,
        branching: usize,
        params: &SnowflakeParams,
    ) -> Result<SnowflakePlan> {
        params.validate()?;
        let minimal = params.minimal_ring_mirror_count;
        if mirrors == 0 {
            return Err(TopologyError::InvalidMirrorDistribution {
                total: 0,
                ring_mirrors: 0,
                star_mirrors: 0,
                reason: "at least one mirror is required".to_string(),
            });
        }
        if mirrors < minimal {
            return Err(TopologyError::InsufficientMirrorsForRing {
                available: mirrors,
                required: minimal,
                ring: 1,
            });
        }

        let ring_budget = (mirrors as f64 * (1.0 - params.extern_star_ratio)).floor() as usize;
        let star_budget = mirrors - ring_budget;
        if ring_budget < minimal {
            return Err(TopologyError::InsufficientMirrorsForRing {
                available: ring_budget,
                required: minimal,
                ring: 1,
            });
        }

        // Bridge budgeting may not be satisfiable at the maximum layer
        // count; fall back to fewer rings before rejecting outright.
        let start_layers = params.max_ring_layers.min(ring_budget / minimal);
        let mut last_err = None;
        for layers in (1..=start_layers).rev() {
            match Self::layout(mirrors, ring_budget, star_budget, layers, branching, params) {
                Ok(plan) => return Ok(plan),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or(TopologyError::InsufficientMirrorsForRing {
            available: ring_budget,
            required: minimal,
            ring: 1,
        }))
    }

    fn layout(
        mirrors: usize,
        ring_budget: usize,
        star_budget: usize,
        layers: usize,
        branching: usize,
        params: &SnowflakeParams,
    ) -> Result<SnowflakePlan> {
        let minimal = params.minimal_ring_mirror_count;
        let step = params.ring_bridge_step + 1;
        let height = params.bridge_height;

        // Ring sizes outside-in, remainder to the outermost rings.
        let base = ring_budget / layers;
        let remainder = ring_budget % layers;
        let mut sizes: Vec<usize> = (0..layers)
            .map(|i| base + usize::from(i < remainder))
            .collect();

        // Provisional bridge counts from the pre-steal sizes.
        let provisional: Vec<usize> = (0..layers.saturating_sub(1))
            .map(|r| bridge_positions(sizes[r], params.ring_bridge_offset, step).len())
            .collect();
        let wanted: usize = provisional.iter().sum::<usize>() * height;

        // Steal the bridge mirrors from the innermost ring first,
        // keeping every ring at the minimum.
        let mut need = wanted;
        for size in sizes.iter_mut().rev() {
            let take = need.min(*size - minimal);
            *size -= take;
            need -= take;
            if need == 0 {
                break;
            }
        }
        if need > 0 {
            return Err(TopologyError::InsufficientMirrorsForRing {
                available: sizes[layers - 1],
                required: minimal + need,
                ring: layers,
            });
        }

        // Final bridge placement against the post-steal sizes; mirrors
        // budgeted for bridges that no longer fit flow back into the
        // innermost ring.
        let mut placed_per_ring: Vec<Vec<usize>> = Vec::new();
        let mut placed_total = 0usize;
        for r in 0..layers.saturating_sub(1) {
            let mut positions = bridge_positions(sizes[r], params.ring_bridge_offset, step);
            positions.truncate(provisional[r]);
            placed_total += positions.len();
            placed_per_ring.push(positions);
        }
        let refund = (wanted / height.max(1) - placed_total) * height;
        if let Some(innermost) = sizes.last_mut() {
            *innermost += refund;
        }

        let mut bridges = Vec::new();
        for (r, positions) in placed_per_ring.iter().enumerate() {
            for &outer_pos in positions {
                let inner_pos = (outer_pos * sizes[r + 1]) / sizes[r] % sizes[r + 1];
                bridges.push(BridgeSpec {
                    outer_ring: r,
                    outer_pos,
                    inner_pos,
                });
            }
        }

        // Star ports around the outermost ring.
        let mut ports = Vec::new();
        if star_budget > 0 {
            let positions = bridge_positions(sizes[0], 0, step);
            let port_count = positions.len().min(star_budget);
            if port_count == 0 {
                return Err(TopologyError::InvalidMirrorDistribution {
                    total: mirrors,
                    ring_mirrors: ring_budget,
                    star_mirrors: star_budget,
                    reason: "no star port fits on the outermost ring".to_string(),
                });
            }
            let bucket_base = star_budget / port_count;
            let bucket_rem = star_budget % port_count;
            let capacity =
                subtree_capacity(branching.max(1), params.extern_star_max_tree_depth);
            for (j, &outer_pos) in positions[..port_count].iter().enumerate() {
                let bucket = bucket_base + usize::from(j < bucket_rem);
                let chain_len = params.bridge_to_extern_star_distance.min(bucket - 1);
                let subtree_size = bucket - chain_len;
                if subtree_size > capacity {
                    return Err(TopologyError::InvalidMirrorDistribution {
                        total: mirrors,
                        ring_mirrors: ring_budget,
                        star_mirrors: star_budget,
                        reason: format!(
                            "external star of {subtree_size} mirrors exceeds the \
                             depth-{} subtree capacity of {capacity}",
                            params.extern_star_max_tree_depth
                        ),
                    });
                }
                ports.push(PortSpec {
                    outer_pos,
                    chain_len,
                    subtree_size,
                });
            }
        }

        // Component accounting must close exactly.
        let ring_total: usize = sizes.iter().sum();
        let bridge_total = bridges.len() * height;
        let star_total: usize = ports.iter().map(|p| p.chain_len + p.subtree_size).sum();
        if ring_total + bridge_total + star_total != mirrors {
            return Err(TopologyError::InvalidMirrorDistribution {
                total: mirrors,
                ring_mirrors: ring_total,
                star_mirrors: star_total,
                reason: "component sum does not match the mirror total".to_string(),
            });
        }

        let link_count = ring_total as u64
            + bridges.len() as u64 * (height as u64 + 1)
            + ports
                .iter()
                .map(|p| p.chain_len as u64 + p.subtree_size as u64)
                .sum::<u64>();

        Ok(SnowflakePlan {
            ring_sizes: sizes,
            bridges,
            ports,
            link_count,
            total_mirrors: mirrors,
        })
    }
}

/// Positions `offset, offset + step, …` below `size`.
fn bridge_positions(size: usize, offset: usize, step: usize) -> Vec<usize> {
    (offset..size).step_by(step.max(1)).collect()
}

// ============================================================================
// Strategy
// ============================================================================

pub struct SnowflakeTopology {
    params: SnowflakeParams,
    nodes: NodeArena,
}

impl SnowflakeTopology {
    pub fn new(params: SnowflakeParams) -> Self {
        Self {
            params,
            nodes: NodeArena::new(),
        }
    }

    pub fn params(&self) -> &SnowflakeParams {
        &self.params
    }

    fn materialize(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        let order = build_order(fleet);
        let plan = SnowflakePlan::compute(
            order.len(),
            fleet.target_links_per_mirror(),
            &self.params,
        )?;

        self.nodes.clear();
        let mut cursor = 0usize;
        let mut take = |n: usize| {
            let slice = order[cursor..cursor + n].to_vec();
            cursor += n;
            slice
        };

        // Rings, outermost first.
        let ring_members: Vec<Vec<MirrorId>> =
            plan.ring_sizes.iter().map(|&s| take(s)).collect();
        let bridge_members: Vec<Vec<MirrorId>> = plan
            .bridges
            .iter()
            .map(|_| take(self.params.bridge_height))
            .collect();
        let port_members: Vec<(Vec<MirrorId>, Vec<MirrorId>)> = plan
            .ports
            .iter()
            .map(|p| (take(p.chain_len), take(p.subtree_size)))
            .collect();

        let mut links = Vec::new();
        let mut ring_nodes: Vec<Vec<NodeId>> = Vec::new();
        for (ring, members) in ring_members.iter().enumerate() {
            let mut nodes_of_ring = Vec::with_capacity(members.len());
            for (i, &mirror) in members.iter().enumerate() {
                let node = self.nodes.alloc(StructureType::Snowflake, mirror);
                if ring == 0 && i == 0 {
                    self.nodes.set_root(node)?;
                }
                nodes_of_ring.push(node);
            }
            for i in 0..members.len() {
                let next = (i + 1) % members.len();
                self.nodes.adopt(nodes_of_ring[i], nodes_of_ring[next]);
                links.push(fleet.create_link(members[i], members[next], tick)?);
            }
            ring_nodes.push(nodes_of_ring);
        }

        // Bridges: outer port, `bridge_height` intermediates, inner
        // landing mirror.
        for (spec, chain) in plan.bridges.iter().zip(&bridge_members) {
            let outer = ring_members[spec.outer_ring][spec.outer_pos];
            let inner = ring_members[spec.outer_ring + 1][spec.inner_pos];
            let mut previous = outer;
            let mut previous_node = ring_nodes[spec.outer_ring][spec.outer_pos];
            for &hop in chain {
                let node = self.nodes.alloc(StructureType::Snowflake, hop);
                self.nodes.adopt(previous_node, node);
                links.push(fleet.create_link(previous, hop, tick)?);
                previous = hop;
                previous_node = node;
            }
            links.push(fleet.create_link(previous, inner, tick)?);
        }

        // External stars: approach chain plus a breadth-first balanced
        // subtree, both budgeted by the plan.
        let branching = fleet.target_links_per_mirror().max(1);
        for (spec, (chain, subtree)) in plan.ports.iter().zip(&port_members) {
            if subtree.is_empty() {
                continue;
            }
            let mut previous = ring_members[0][spec.outer_pos];
            let mut previous_node = ring_nodes[0][spec.outer_pos];
            for &hop in chain {
                let node = self.nodes.alloc(StructureType::Snowflake, hop);
                self.nodes.adopt(previous_node, node);
                links.push(fleet.create_link(previous, hop, tick)?);
                previous = hop;
                previous_node = node;
            }

            let mut subtree_nodes = Vec::with_capacity(subtree.len());
            let root_node = self.nodes.alloc(StructureType::Star, subtree[0]);
            self.nodes.adopt(previous_node, root_node);
            subtree_nodes.push(root_node);
            links.push(fleet.create_link(previous, subtree[0], tick)?);

            let mut queue = std::collections::VecDeque::from([0usize]);
            let mut next_child = 1usize;
            while next_child < subtree.len() {
                let Some(&parent_idx) = queue.front() else { break };
                if self.nodes.child_count(subtree_nodes[parent_idx]) >= branching {
                    queue.pop_front();
                    continue;
                }
                let node = self.nodes.alloc(StructureType::Star, subtree[next_child]);
                self.nodes.adopt(subtree_nodes[parent_idx], node);
                subtree_nodes.push(node);
                links.push(fleet.create_link(
                    subtree[parent_idx],
                    subtree[next_child],
                    tick,
                )?);
                queue.push_back(next_child);
                next_child += 1;
            }
        }

        Ok(links)
    }
}

impl TopologyStrategy for SnowflakeTopology {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Snowflake
    }

    fn planned_link_count(&self, mirrors: usize, links_per_mirror: usize) -> Result<u64> {
        SnowflakePlan::compute(mirrors, links_per_mirror, &self.params).map(|p| p.link_count)
    }

    fn build(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        self.materialize(fleet, tick)
    }

    // A composite is re-planned globally on membership change; the ring
    // partition itself shifts with the total.
    fn add_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()> {
        self.planned_link_count(
            fleet.live_mirror_count() + count,
            fleet.target_links_per_mirror(),
        )?;
        for _ in 0..count {
            fleet.create_mirror(tick);
        }
        fleet.close_all_links();
        self.materialize(fleet, tick)?;
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
        self.materialize(fleet, tick)?;
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

    fn params() -> SnowflakeParams {
        SnowflakeParams {
            max_ring_layers: 2,
            extern_star_ratio: 0.3,
            ..SnowflakeParams::default()
        }
    }

    #[test]
    fn ten_mirrors_are_accepted() {
        let plan = SnowflakePlan::compute(10, 3, &params()).unwrap();
        assert_eq!(plan.total_mirrors, 10);
        let ring_total: usize = plan.ring_sizes.iter().sum();
        let star_total: usize = plan
            .ports
            .iter()
            .map(|p| p.chain_len + p.subtree_size)
            .sum();
        let bridge_total = plan.bridges.len() * 1;
        assert_eq!(ring_total + star_total + bridge_total, 10);
    }

    #[test]
    fn two_mirrors_are_rejected_for_the_first_ring() {
        let err = SnowflakePlan::compute(2, 3, &params()).unwrap_err();
        assert_eq!(
            err,
            TopologyError::InsufficientMirrorsForRing {
                available: 2,
                required: 3,
                ring: 1,
            }
        );
    }

    #[test]
    fn bridge_chains_carry_exactly_the_configured_height() {
        // 20 ring mirrors across two layers; bridge every third
        // position, two intermediates per bridge.
        let params = SnowflakeParams {
            max_ring_layers: 2,
            ring_bridge_step: 2,
            bridge_height: 2,
            ..SnowflakeParams::default()
        };
        let plan = SnowflakePlan::compute(20, 2, &params).unwrap();

        assert_eq!(plan.ring_sizes, vec![9, 5]);
        assert_eq!(plan.bridges.len(), 3);
        // Rings contribute one link per member, each bridge height + 1.
        assert_eq!(plan.link_count, 14 + 3 * 3);

        let mut fleet = fleet_with(20, 2);
        let mut strategy = SnowflakeTopology::new(params);
        let links = strategy.build(&mut fleet, 0).unwrap();
        assert_eq!(links.len() as u64, plan.link_count);
    }

    #[test]
    fn layer_count_backs_off_under_bridge_pressure() {
        // At two layers the default step would demand a bridge per
        // position, which 10 mirrors cannot fund; the plan settles on a
        // single ring instead of failing.
        let plan = SnowflakePlan::compute(10, 3, &params()).unwrap();
        assert_eq!(plan.ring_sizes, vec![7]);
        assert!(plan.bridges.is_empty());
        assert_eq!(plan.ports.len(), 3);
        assert_eq!(plan.link_count, 10);
    }

    #[test]
    fn invalid_knobs_are_rejected_by_name() {
        let params = SnowflakeParams {
            minimal_ring_mirror_count: 2,
            ..SnowflakeParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(TopologyError::InvalidRingParameter {
                parameter: "minimal_ring_mirror_count",
                ..
            })
        ));

        let params = SnowflakeParams {
            extern_star_ratio: 1.5,
            ..SnowflakeParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(TopologyError::InvalidStarParameter {
                parameter: "extern_star_ratio",
                ..
            })
        ));
    }

    #[test]
    fn oversized_star_subtrees_are_rejected() {
        // One port swallows the whole star budget but depth 1 only
        // allows a single subtree node.
        let params = SnowflakeParams {
            ring_bridge_step: 99,
            extern_star_ratio: 0.5,
            ..SnowflakeParams::default()
        };
        let err = SnowflakePlan::compute(12, 3, &params).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::InvalidMirrorDistribution { .. }
        ));
    }

    #[test]
    fn build_consumes_every_mirror() {
        let mut fleet = fleet_with(10, 3);
        let mut strategy = SnowflakeTopology::new(params());
        let links = strategy.build(&mut fleet, 0).unwrap();
        assert_eq!(links.len(), 10);
        assert_eq!(strategy.nodes.len(), 10);
    }

    #[test]
    fn plan_is_pure_and_repeatable() {
        let a = SnowflakePlan::compute(24, 3, &params()).unwrap();
        let b = SnowflakePlan::compute(24, 3, &params()).unwrap();
        assert_eq!(a, b);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            // Whatever the inputs, an accepted plan spends every mirror
            // exactly once and keeps every ring at the minimum.
            #[test]
            fn accepted_plans_account_for_every_mirror(
                mirrors in 3usize..150,
                branching in 1usize..6,
                step in 0usize..4,
                ratio in 0.0f64..0.6,
            ) {
                let params = SnowflakeParams {
                    max_ring_layers: 3,
                    ring_bridge_step: step,
                    extern_star_ratio: ratio,
                    extern_star_max_tree_depth: 4,
                    ..SnowflakeParams::default()
                };
                if let Ok(plan) = SnowflakePlan::compute(mirrors, branching, &params) {
                    let rings: usize = plan.ring_sizes.iter().sum();
                    let bridges = plan.bridges.len() * params.bridge_height;
                    let stars: usize = plan
                        .ports
                        .iter()
                        .map(|p| p.chain_len + p.subtree_size)
                        .sum();
                    prop_assert_eq!(rings + bridges + stars, mirrors);
                    for &size in &plan.ring_sizes {
                        prop_assert!(size >= params.minimal_ring_mirror_count);
                    }
                }
            }
        }
    }
}
