//! # replimesh-sim: deterministic simulation driver
//!
//! The outer loop around [`replimesh_core::Network`]: builds a network
//! from a config table, ticks it in strictly increasing order, fans
//! events to the registered probes, optionally runs the invariant suite
//! after every tick, and collects a serialisable [`SimSummary`] at the
//! end.
//!
//! Determinism is checked the blunt way: run the same seed twice and
//! compare the summaries ([`Simulation::check_determinism`]).

use replimesh_config::{ConfigError, SimProperties, keys};
use replimesh_core::{
    Action, LinkProbe, MirrorProbe, Network, NetworkError, StrategyKind,
};
use serde::Serialize;
use thiserror::Error;

pub mod invariant;
pub mod scenarios;

pub use invariant::{InvariantChecker, InvariantResult, InvariantSuite};
pub use scenarios::{Scenario, ScenarioType};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("invariant `{invariant}` violated at tick {tick}: {message}")]
    InvariantViolation {
        invariant: String,
        message: String,
        tick: u64,
    },

    #[error("determinism check failed: seed {seed} produced diverging summaries")]
    Nondeterministic { seed: u64 },
}

// ============================================================================
// Summary
// ============================================================================

/// Serialisable end-of-run summary; equal summaries mean equal traces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimSummary {
    pub seed: u64,
    pub strategy: String,
    pub ticks_run: u64,
    pub live_mirrors: usize,
    pub mirrors_with_data: usize,
    pub active_links: usize,
    pub target_links: u64,
    /// Total payload units moved over the whole run.
    pub total_bandwidth: u64,
    /// Probe report lines at the final tick.
    pub reports: Vec<(String, String)>,
}

// ============================================================================
// Simulation
// ============================================================================

/// The outer simulation loop.
pub struct Simulation {
    network: Network,
    seed: u64,
    ticks: u64,
    current_tick: u64,
    invariants: Option<InvariantSuite>,
}

impl Simulation {
    /// Builds a simulation from a config table and a starting strategy.
    ///
    /// The standard mirror and link probes are always registered.
    pub fn from_props(props: SimProperties, strategy: StrategyKind) -> Result<Self, SimError> {
        let ticks = props.get_u64(keys::SIM_TIME)?;
        let seed = props.get_u64_or(keys::SEED, 0)?;
        let mut network = Network::build(props, strategy)?;
        network.register_probe(Box::new(MirrorProbe::new()));
        network.register_probe(Box::new(LinkProbe::new()));
        Ok(Self {
            network,
            seed,
            ticks,
            current_tick: 0,
            invariants: None,
        })
    }

    /// Builds a simulation from a named scenario, scheduling its
    /// control actions up front.
    pub fn from_scenario(scenario: ScenarioType, seed: u64) -> Result<Self, SimError> {
        let built = scenario.build(seed);
        let mut sim = Self::from_props(built.props, built.strategy)?;
        for (action, tick) in built.actions {
            sim.network.schedule(action, tick);
        }
        Ok(sim)
    }

    /// Enables the invariant suite after every tick.
    pub fn with_invariants(mut self, suite: InvariantSuite) -> Self {
        self.invariants = Some(suite);
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Schedules an action on the underlying network.
    pub fn schedule(&mut self, action: Action, tick: u64) -> replimesh_types::ActionId {
        self.network.schedule(action, tick)
    }

    /// Advances a single tick.
    pub fn step(&mut self) -> Result<(), SimError> {
        let tick = self.current_tick + 1;
        self.network.tick(tick)?;
        self.current_tick = tick;
        if let Some(suite) = &mut self.invariants {
            if let InvariantResult::Violated {
                invariant,
                message,
                ..
            } = suite.check_all(&self.network, tick)
            {
                return Err(SimError::InvariantViolation {
                    invariant,
                    message,
                    tick,
                });
            }
        }
        Ok(())
    }

    /// Runs to the configured tick count and returns the summary.
    pub fn run(&mut self) -> Result<SimSummary, SimError> {
        while self.current_tick < self.ticks {
            self.step()?;
        }
        tracing::info!(
            ticks = self.ticks,
            mirrors = self.network.fleet().live_mirror_count(),
            links = self.network.fleet().active_link_count(),
            "simulation finished"
        );
        Ok(self.summary())
    }

    /// Runs part of the configured range; useful for mid-run asserts.
    pub fn run_until(&mut self, tick: u64) -> Result<(), SimError> {
        while self.current_tick < tick.min(self.ticks) {
            self.step()?;
        }
        Ok(())
    }

    pub fn summary(&self) -> SimSummary {
        let fleet = self.network.fleet();
        SimSummary {
            seed: self.seed,
            strategy: self.network.strategy_kind().to_string(),
            ticks_run: self.current_tick,
            live_mirrors: fleet.live_mirror_count(),
            mirrors_with_data: fleet
                .mirrors()
                .filter(|m| m.data().is_some_and(replimesh_types::DataPackage::is_complete))
                .count(),
            active_links: fleet.active_link_count(),
            target_links: self.network.target_link_count(),
            total_bandwidth: self.network.bandwidth_history().values().sum(),
            reports: self
                .network
                .probe_reports(self.current_tick)
                .into_iter()
                .map(|(name, line)| (name.to_string(), line))
                .collect(),
        }
    }

    /// Runs a scenario twice with the same seed and compares summaries.
    pub fn check_determinism(scenario: ScenarioType, seed: u64) -> Result<SimSummary, SimError> {
        let first = Self::from_scenario(scenario, seed)?.run()?;
        let second = Self::from_scenario(scenario, seed)?.run()?;
        if first == second {
            Ok(first)
        } else {
            Err(SimError::Nondeterministic { seed })
        }
    }
}
