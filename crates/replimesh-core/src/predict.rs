//! Effect prediction: pure estimates of what a scheduled action will do
//! to the network, computed without mutating anything.
//!
//! Four outputs per action: the active-link delta (a ratio in
//! `[-1, +1]`), bandwidth and time-to-write deltas (integer percent in
//! `[-100, +100]`) and the latency in ticks until the effect is fully
//! observable.

use replimesh_config::{ConfigError, SimProperties, TimingConfig, keys};
use serde::Serialize;

use crate::effector::Action;
use crate::error::NetworkError;
use crate::network::Network;
use crate::topology::{StrategyKind, planned_link_count_for};

/// Predicted steady-state deltas for one action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Effect {
    /// Relative change of the target link count, clamped to `[-1, +1]`.
    pub delta_active_links: f64,
    /// Bandwidth-utilisation change in percent, clamped to `[-100, +100]`.
    pub delta_bandwidth: i64,
    /// Expected propagation-hops improvement in percent, clamped to
    /// `[-100, +100]`.
    pub delta_time_to_write: i64,
    /// Ticks until the action's effect is fully observable.
    pub latency: u64,
}

/// Predicts the effect of `action` on `network`. Pure; repeated calls
/// yield identical results.
pub fn predict(network: &Network, action: &Action) -> Result<Effect, ConfigError> {
    let props = network.props();
    let fleet = network.fleet();
    let mirrors = fleet.live_mirror_count();
    let links_per_mirror = fleet.target_links_per_mirror();
    let current = network.target_link_count();

    // Hypothetical fleet after the action.
    let (mirrors_after, links_after, kind_after) = match action {
        Action::MirrorChange { target } => {
            (*target, links_per_mirror, network.strategy_kind())
        }
        Action::TargetLinkChange { links_per_mirror: k } => {
            (mirrors, *k, network.strategy_kind())
        }
        Action::TopologyChange { kind } => (mirrors, links_per_mirror, *kind),
    };

    // A hypothetical plan that is structurally impossible predicts no
    // change; configuration failures surface to the caller.
    let predicted = match planned_link_count_for(kind_after, props, mirrors_after, links_after) {
        Ok(count) => count,
        Err(NetworkError::Config(err)) => return Err(err),
        Err(NetworkError::Topology(_)) => current,
    };

    let delta_active_links =
        ((predicted as f64 - current as f64) / current.max(1) as f64).clamp(-1.0, 1.0);

    let delta_bandwidth = bandwidth_delta(props, current, predicted)?;

    let delta_time_to_write = time_to_write_delta(
        network.strategy_kind(),
        kind_after,
        mirrors,
        links_per_mirror,
        mirrors_after,
        links_after,
    );

    let latency = latency_for(props, action, mirrors)?;

    Ok(Effect {
        delta_active_links,
        delta_bandwidth,
        delta_time_to_write,
        latency,
    })
}

/// Utilisation change in percent: `links · link_bandwidth / max_bandwidth`
/// after minus before.
fn bandwidth_delta(
    props: &SimProperties,
    current: u64,
    predicted: u64,
) -> Result<i64, ConfigError> {
    let max_bandwidth = props.get_u64(keys::MAX_BANDWIDTH)?;
    if max_bandwidth == 0 {
        return Err(ConfigError::InvalidValue {
            key: keys::MAX_BANDWIDTH.to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    let link_bandwidth = props.get_u64(keys::LINK_BANDWIDTH)? as f64;
    let utilisation = |links: u64| links as f64 * link_bandwidth / max_bandwidth as f64;
    let delta = (utilisation(predicted) - utilisation(current)) * 100.0;
    Ok((delta.round() as i64).clamp(-100, 100))
}

/// Expected hops to full depth of a balanced k-ary tree over `m` nodes.
fn tree_hops(mirrors: usize, links_per_mirror: usize) -> i64 {
    if mirrors <= 1 {
        return 0;
    }
    let branching = links_per_mirror.max(2) as f64;
    ((mirrors as f64).ln() / branching.ln()).ceil() as i64
}

fn time_to_write_delta(
    kind_before: StrategyKind,
    kind_after: StrategyKind,
    mirrors: usize,
    links_per_mirror: usize,
    mirrors_after: usize,
    links_after: usize,
) -> i64 {
    if links_after <= 1 {
        return 0;
    }
    // Saturated-improvement proxy for going fully connected.
    if kind_after == StrategyKind::FullyConnected && kind_before != StrategyKind::FullyConnected
    {
        return 20;
    }
    if kind_after == StrategyKind::BalancedTree {
        let current = tree_hops(mirrors, links_per_mirror);
        let predicted = tree_hops(mirrors_after, links_after);
        let delta = (current - predicted) * 100 / current.max(1);
        return delta.clamp(-100, 100);
    }
    0
}

/// Latency in ticks until the action's effect is observable.
///
/// Growing the fleet pays full startup, readiness and link activation;
/// link-only changes pay activation alone; pure shrinks are immediate.
fn latency_for(
    props: &SimProperties,
    action: &Action,
    current_mirrors: usize,
) -> Result<u64, ConfigError> {
    let timing = TimingConfig::from_props(props)?;
    let activation = timing.link_activation.max;
    Ok(match action {
        Action::MirrorChange { target } if *target > current_mirrors => {
            timing.startup.max + timing.ready.max + activation
        }
        Action::MirrorChange { .. } => 0,
        Action::TargetLinkChange { .. } | Action::TopologyChange { .. } => activation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_hops_grow_logarithmically() {
        assert_eq!(tree_hops(1, 3), 0);
        assert!(tree_hops(27, 3) <= tree_hops(243, 3));
        // Higher branching means fewer hops.
        assert!(tree_hops(100, 8) <= tree_hops(100, 2));
    }
}
