//! Read-only probes sampled at the end of each tick.
//!
//! Probes observe a consistent post-advancement snapshot and must not
//! mutate the network; the interface hands them `&Network` only.

use std::collections::BTreeMap;

use replimesh_types::MirrorState;
use serde::Serialize;

use crate::network::Network;

/// Observer interface: record on `sample`, emit on `report`.
pub trait Probe {
    fn name(&self) -> &'static str;

    /// Records a sample for `tick`.
    fn sample(&mut self, network: &Network, tick: u64);

    /// Human-readable line for the latest sample at or before `tick`.
    fn report(&self, tick: u64) -> String;
}

// ============================================================================
// Mirror Probe
// ============================================================================

/// Per-state mirror counts plus the ready-over-target ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MirrorSample {
    pub starting: usize,
    pub up: usize,
    pub ready: usize,
    pub has_data: usize,
    pub stopping: usize,
    pub target_mirrors: usize,
    /// Mirrors at `Ready` or beyond, relative to the target count.
    pub ready_ratio: f64,
}

#[derive(Debug, Default)]
pub struct MirrorProbe {
    history: BTreeMap<u64, MirrorSample>,
}

impl MirrorProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &BTreeMap<u64, MirrorSample> {
        &self.history
    }

    pub fn latest(&self, tick: u64) -> Option<&MirrorSample> {
        self.history.range(..=tick).next_back().map(|(_, s)| s)
    }
}

impl Probe for MirrorProbe {
    fn name(&self) -> &'static str {
        "mirrors"
    }

    fn sample(&mut self, network: &Network, tick: u64) {
        let mut sample = MirrorSample {
            target_mirrors: network.target_mirror_count(),
            ..MirrorSample::default()
        };
        for mirror in network.fleet().mirrors() {
            match mirror.state() {
                MirrorState::Down | MirrorState::Starting => sample.starting += 1,
                MirrorState::Up => sample.up += 1,
                MirrorState::Ready => sample.ready += 1,
                MirrorState::HasData => sample.has_data += 1,
                MirrorState::Stopping | MirrorState::Stopped => sample.stopping += 1,
            }
        }
        let ready_or_beyond = sample.ready + sample.has_data;
        sample.ready_ratio = ready_or_beyond as f64 / sample.target_mirrors.max(1) as f64;
        self.history.insert(tick, sample);
    }

    fn report(&self, tick: u64) -> String {
        match self.latest(tick) {
            Some(s) => format!(
                "starting={} up={} ready={} has-data={} stopping={} ready-ratio={:.2}",
                s.starting, s.up, s.ready, s.has_data, s.stopping, s.ready_ratio
            ),
            None => "no samples".to_string(),
        }
    }
}

// ============================================================================
// Link Probe
// ============================================================================

/// Active links against the strategy's target figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LinkSample {
    pub active: usize,
    pub target: u64,
    pub active_ratio: f64,
}

#[derive(Debug, Default)]
pub struct LinkProbe {
    history: BTreeMap<u64, LinkSample>,
}

impl LinkProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &BTreeMap<u64, LinkSample> {
        &self.history
    }

    pub fn latest(&self, tick: u64) -> Option<&LinkSample> {
        self.history.range(..=tick).next_back().map(|(_, s)| s)
    }
}

impl Probe for LinkProbe {
    fn name(&self) -> &'static str {
        "links"
    }

    fn sample(&mut self, network: &Network, tick: u64) {
        let active = network.fleet().active_link_count();
        let target = network.target_link_count();
        self.history.insert(
            tick,
            LinkSample {
                active,
                target,
                active_ratio: active as f64 / target.max(1) as f64,
            },
        );
    }

    fn report(&self, tick: u64) -> String {
        match self.latest(tick) {
            Some(s) => format!(
                "active={} target={} active-ratio={:.2}",
                s.active, s.target, s.active_ratio
            ),
            None => "no samples".to_string(),
        }
    }
}
