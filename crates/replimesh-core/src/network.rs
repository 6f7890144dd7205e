//! The network aggregate.
//!
//! [`Network`] owns the fleet, the active topology strategy, the
//! effector and the registered probes, and drives the per-tick phase
//! sequence:
//!
//! 1. sweep mirrors stopped on a previous tick, advance the rest;
//! 2. sweep closed links, advance the rest, propagate payload data;
//! 3. apply effector actions due at this tick;
//! 4. sample probes against the settled snapshot.
//!
//! Strategy mutators validate before they allocate, so a failed control
//! action leaves the graph untouched.

use std::collections::BTreeMap;

use replimesh_config::{ConfigError, SimProperties, TimingConfig, keys};
use replimesh_types::ActionId;

use crate::effector::{Action, Effector, ScheduledAction};
use crate::error::NetworkError;
use crate::fleet::Fleet;
use crate::predict::{Effect, predict};
use crate::probe::Probe;
use crate::topology::{StrategyKind, TopologyStrategy, build_strategy};

pub struct Network {
    fleet: Fleet,
    strategy: Box<dyn TopologyStrategy>,
    effector: Effector,
    probes: Vec<Box<dyn Probe>>,
    props: SimProperties,
    target_mirrors: usize,
    /// Total payload units delivered per tick.
    bandwidth_history: BTreeMap<u64, u64>,
    current_tick: u64,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("probe_count", &self.probes.len())
            .field("target_mirrors", &self.target_mirrors)
            .field("bandwidth_history", &self.bandwidth_history)
            .field("current_tick", &self.current_tick)
            .finish()
    }
}

impl Network {
    /// Builds the initial network: creates the fleet from config, then
    /// asks the strategy for the initial link set.
    pub fn build(props: SimProperties, kind: StrategyKind) -> Result<Self, NetworkError> {
        let timing = TimingConfig::from_props(&props)?;
        let seed = props.get_u64_or(keys::SEED, 0)?;
        let num_mirrors = props.get_u64(keys::NUM_MIRRORS)? as usize;
        let links_per_mirror = props.get_u64(keys::NUM_LINKS_PER_MIRROR)? as usize;
        let file_size = props.get_u64(keys::FILE_SIZE)?;

        let mut fleet = Fleet::new(timing, seed, file_size, links_per_mirror);
        let mut strategy = build_strategy(kind, &props)?;
        for _ in 0..num_mirrors {
            fleet.create_mirror(0);
        }
        strategy.build(&mut fleet, 0)?;
        tracing::info!(
            strategy = %kind,
            mirrors = num_mirrors,
            links = fleet.open_link_count(),
            "network built"
        );

        Ok(Self {
            fleet,
            strategy,
            effector: Effector::new(),
            probes: Vec::new(),
            props,
            target_mirrors: num_mirrors,
            bandwidth_history: BTreeMap::new(),
            current_tick: 0,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn props(&self) -> &SimProperties {
        &self.props
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn target_mirror_count(&self) -> usize {
        self.target_mirrors
    }

    /// The link count the active strategy would maintain right now.
    pub fn target_link_count(&self) -> u64 {
        self.strategy.target_link_count(&self.fleet)
    }

    /// The same figure after hypothetically applying `action`. Pure.
    pub fn predicted_target_link_count(&self, action: &Action) -> u64 {
        self.strategy.predicted_target_link_count(&self.fleet, action)
    }

    pub fn bandwidth_history(&self) -> &BTreeMap<u64, u64> {
        &self.bandwidth_history
    }

    pub fn pending_action_count(&self) -> usize {
        self.effector.pending_count()
    }

    // ------------------------------------------------------------------
    // Control surface
    // ------------------------------------------------------------------

    /// Schedules an action for `tick`, returning its cancellation
    /// handle.
    pub fn schedule(&mut self, action: Action, tick: u64) -> ActionId {
        let id = self.fleet.next_action_id();
        tracing::debug!(action = ?action, tick, handle = %id, "action scheduled");
        self.effector.schedule(id, action, tick)
    }

    /// Cancels a pending action; silently ignores applied or unknown
    /// handles.
    pub fn cancel(&mut self, id: ActionId) {
        self.effector.cancel(id);
    }

    /// Predicts the effect of an action without mutating anything.
    pub fn predict(&self, action: &Action) -> Result<Effect, ConfigError> {
        predict(self, action)
    }

    pub fn register_probe(&mut self, probe: Box<dyn Probe>) {
        self.probes.push(probe);
    }

    /// Latest report line from every registered probe.
    pub fn probe_reports(&self, tick: u64) -> Vec<(&'static str, String)> {
        self.probes
            .iter()
            .map(|p| (p.name(), p.report(tick)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Tick loop
    // ------------------------------------------------------------------

    /// Advances the whole network by one tick. Ticks must be called in
    /// strictly increasing order; gaps count as elapsed time.
    pub fn tick(&mut self, tick: u64) -> Result<(), NetworkError> {
        debug_assert!(tick > self.current_tick, "ticks must strictly increase");
        self.current_tick = tick;

        // Phase 1: mirrors.
        for removed in self.fleet.sweep_stopped_mirrors() {
            self.strategy.forget_mirror(removed);
        }
        self.fleet.sample_crashes(tick);
        self.fleet.advance_mirrors(tick);

        // Phase 2: links and data propagation.
        self.fleet.sweep_closed_links();
        self.fleet.advance_links(tick);
        let delivered = self.fleet.propagate_data(tick);
        self.bandwidth_history.insert(tick, delivered);

        // Phase 3: control actions due at this tick.
        for ScheduledAction { action, .. } in self.effector.drain_due(tick) {
            self.apply(action, tick)?;
        }

        // Phase 4: probes observe the settled snapshot.
        let mut probes = std::mem::take(&mut self.probes);
        for probe in &mut probes {
            probe.sample(self, tick);
        }
        self.probes = probes;

        Ok(())
    }

    fn apply(&mut self, action: Action, tick: u64) -> Result<(), NetworkError> {
        match action {
            Action::MirrorChange { target } => self.set_target_mirror_count(target, tick),
            Action::TargetLinkChange { links_per_mirror } => {
                self.set_target_links_per_mirror(links_per_mirror, tick)
            }
            Action::TopologyChange { kind } => self.set_strategy_kind(kind, tick),
        }
    }

    /// Grows or shrinks the fleet toward `target` via the strategy.
    pub fn set_target_mirror_count(
        &mut self,
        target: usize,
        tick: u64,
    ) -> Result<(), NetworkError> {
        self.target_mirrors = target;
        let live = self.fleet.live_mirror_count();
        if target > live {
            tracing::info!(from = live, to = target, tick, "growing fleet");
            self.strategy
                .add_mirrors(&mut self.fleet, target - live, tick)?;
        } else if target < live {
            tracing::info!(from = live, to = target, tick, "shrinking fleet");
            self.strategy
                .remove_mirrors(&mut self.fleet, live - target, tick)?;
        }
        Ok(())
    }

    /// Updates the target links-per-mirror; past tick zero this
    /// restarts the topology so the new degree takes hold.
    pub fn set_target_links_per_mirror(
        &mut self,
        links_per_mirror: usize,
        tick: u64,
    ) -> Result<(), NetworkError> {
        // Validate against the new degree before touching anything.
        self.strategy
            .planned_link_count(self.fleet.live_mirror_count(), links_per_mirror)?;
        self.fleet.set_target_links_per_mirror(links_per_mirror);
        if tick > 0 {
            self.strategy.restart(&mut self.fleet, tick)?;
        }
        Ok(())
    }

    /// Swaps the active strategy; past tick zero the new strategy
    /// rebuilds the link set in place.
    pub fn set_strategy_kind(&mut self, kind: StrategyKind, tick: u64) -> Result<(), NetworkError> {
        if kind == self.strategy.kind() {
            return Ok(());
        }
        let mut strategy = build_strategy(kind, &self.props)?;
        strategy.planned_link_count(
            self.fleet.live_mirror_count(),
            self.fleet.target_links_per_mirror(),
        )?;
        tracing::info!(from = %self.strategy.kind(), to = %kind, tick, "strategy swap");
        if tick > 0 {
            strategy.restart(&mut self.fleet, tick)?;
        }
        self.strategy = strategy;
        Ok(())
    }
}
