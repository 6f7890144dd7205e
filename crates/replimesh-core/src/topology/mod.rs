//! Topology strategies.
//!
//! A strategy builds and maintains the link set for a named structural
//! invariant (fully connected, ring, balanced tree, …). The capability
//! set is deliberately flat: build, add, remove, restart, plus the two
//! pure link-count queries the effect predictor runs on. Strategies own
//! their structure-node arena and nothing else; all mirror/link mutation
//! goes through the [`Fleet`].

use std::fmt::{self, Display};
use std::str::FromStr;

use replimesh_config::SimProperties;
use replimesh_types::{LinkId, MirrorId};
use thiserror::Error;

use crate::effector::Action;
use crate::error::{NetworkError, Result};
use crate::fleet::Fleet;

pub mod node;

mod fully;
mod line;
mod nconnected;
mod ring;
mod snowflake;
mod star;
mod tree;

pub use fully::FullyConnectedTopology;
pub use line::LineTopology;
pub use nconnected::NConnectedTopology;
pub use ring::RingTopology;
pub use snowflake::{SnowflakeParams, SnowflakePlan, SnowflakeTopology};
pub use star::StarTopology;
pub use tree::BalancedTreeTopology;

// ============================================================================
// Strategy Kinds
// ============================================================================

/// The named strategy family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StrategyKind {
    FullyConnected,
    NConnected,
    BalancedTree,
    Line,
    Ring,
    Star,
    Snowflake,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 7] = [
        StrategyKind::FullyConnected,
        StrategyKind::NConnected,
        StrategyKind::BalancedTree,
        StrategyKind::Line,
        StrategyKind::Ring,
        StrategyKind::Star,
        StrategyKind::Snowflake,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::FullyConnected => "fully-connected",
            StrategyKind::NConnected => "n-connected",
            StrategyKind::BalancedTree => "balanced-tree",
            StrategyKind::Line => "line",
            StrategyKind::Ring => "ring",
            StrategyKind::Star => "star",
            StrategyKind::Snowflake => "snowflake",
        }
    }
}

impl Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown strategy name passed on the CLI or in an action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown topology strategy `{0}`")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fully-connected" | "fully" | "full-mesh" => Ok(StrategyKind::FullyConnected),
            "n-connected" | "nconnected" => Ok(StrategyKind::NConnected),
            "balanced-tree" | "tree" => Ok(StrategyKind::BalancedTree),
            "line" => Ok(StrategyKind::Line),
            "ring" => Ok(StrategyKind::Ring),
            "star" => Ok(StrategyKind::Star),
            "snowflake" => Ok(StrategyKind::Snowflake),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

// ============================================================================
// Strategy Trait
// ============================================================================

/// The polymorphic capability set shared by all strategies.
pub trait TopologyStrategy {
    fn kind(&self) -> StrategyKind;

    /// Builds the initial link set over the mirrors already present in
    /// the fleet. Validates before mutating; returns the created links.
    fn build(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>>;

    /// Grows the graph by `count` freshly created mirrors while
    /// preserving the structural invariant.
    fn add_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()>;

    /// Marks `count` removable mirrors as stopping (never the root,
    /// never below the strategy's minimum size) and pre-wires any
    /// replacement links the invariant needs once they leave.
    fn remove_mirrors(&mut self, fleet: &mut Fleet, count: usize, tick: u64) -> Result<()>;

    /// Tears down all links, retains the mirrors, and rebuilds.
    fn restart(&mut self, fleet: &mut Fleet, tick: u64) -> Result<Vec<LinkId>> {
        fleet.close_all_links();
        self.build(fleet, tick)
    }

    /// Drops a mirror from the strategy's structure bookkeeping after
    /// the network swept it out of the fleet.
    fn forget_mirror(&mut self, id: MirrorId);

    /// Pure link-count plan for a hypothetical fleet of `mirrors`
    /// mirrors at `links_per_mirror` target links. Must not mutate.
    fn planned_link_count(&self, mirrors: usize, links_per_mirror: usize) -> Result<u64>;

    /// The link count this strategy would maintain for the current
    /// fleet. Pure.
    fn target_link_count(&self, fleet: &Fleet) -> u64 {
        self.planned_link_count(fleet.live_mirror_count(), fleet.target_links_per_mirror())
            .unwrap_or(0)
    }

    /// The same figure after hypothetically applying `action`. Pure;
    /// must not mutate. Topology changes are resolved by the effect
    /// predictor, which plans with the destination strategy; here they
    /// fall back to the current plan.
    fn predicted_target_link_count(&self, fleet: &Fleet, action: &Action) -> u64 {
        let mirrors = fleet.live_mirror_count();
        let links_per_mirror = fleet.target_links_per_mirror();
        let (mirrors, links_per_mirror) = match action {
            Action::MirrorChange { target } => (*target, links_per_mirror),
            Action::TargetLinkChange { links_per_mirror: k } => (mirrors, *k),
            Action::TopologyChange { .. } => (mirrors, links_per_mirror),
        };
        self.planned_link_count(mirrors, links_per_mirror)
            .unwrap_or_else(|_| self.target_link_count(fleet))
    }
}

/// Instantiates a strategy of the given kind.
///
/// Only the snowflake strategy reads configuration (its shape knobs,
/// validated here before any use).
pub fn build_strategy(
    kind: StrategyKind,
    props: &SimProperties,
) -> std::result::Result<Box<dyn TopologyStrategy>, NetworkError> {
    Ok(match kind {
        StrategyKind::FullyConnected => Box::new(FullyConnectedTopology::new()),
        StrategyKind::NConnected => Box::new(NConnectedTopology::new()),
        StrategyKind::BalancedTree => Box::new(BalancedTreeTopology::new()),
        StrategyKind::Line => Box::new(LineTopology::new()),
        StrategyKind::Ring => Box::new(RingTopology::new()),
        StrategyKind::Star => Box::new(StarTopology::new()),
        StrategyKind::Snowflake => {
            Box::new(SnowflakeTopology::new(SnowflakeParams::from_props(props)?))
        }
    })
}

/// Pure target-link-count plan for any kind, used by the predictor for
/// topology-change actions.
pub fn planned_link_count_for(
    kind: StrategyKind,
    props: &SimProperties,
    mirrors: usize,
    links_per_mirror: usize,
) -> std::result::Result<u64, NetworkError> {
    let strategy = build_strategy(kind, props)?;
    Ok(strategy.planned_link_count(mirrors, links_per_mirror)?)
}

// ------------------------------------------------------------------
// Shared helpers for the concrete strategies
// ------------------------------------------------------------------

/// Live mirrors in ascending id order, with the fleet root (if live)
/// moved to the front. Strategies use this as their canonical build
/// order so the root lands in the structurally privileged slot.
pub(crate) fn build_order(fleet: &Fleet) -> Vec<MirrorId> {
    let mut ids = fleet.live_mirror_ids();
    if let Some(root) = fleet.root_id() {
        if let Some(pos) = ids.iter().position(|&id| id == root) {
            ids.remove(pos);
            ids.insert(0, root);
        }
    }
    ids
}

/// Picks `count` shutdown victims: live, non-root, highest id first.
pub(crate) fn shutdown_victims(fleet: &Fleet, count: usize) -> Vec<MirrorId> {
    let root = fleet.root_id();
    let mut candidates: Vec<MirrorId> = fleet
        .live_mirror_ids()
        .into_iter()
        .filter(|&id| Some(id) != root)
        .collect();
    candidates.reverse();
    candidates.truncate(count);
    candidates
}
