//! # replimesh-core: mirror fleet, topologies and tick engine
//!
//! The heart of the simulator, arranged as three coupled layers:
//!
//! - **Fleet**: arenas of [`Mirror`]s and [`Link`]s indexed by stable
//!   ids, plus the seeded RNG all randomness flows through.
//! - **Topology strategies**: pluggable builders that create and
//!   maintain the link set under a named structural invariant, each
//!   owning an arena of structure nodes.
//! - **Network**: the aggregate driving the per-tick phase sequence:
//!   state advancement, data propagation, effector application, probe
//!   sampling.
//!
//! Determinism is a design rule, not an accident: arena iteration is in
//! id order, the RNG is seeded from config, and scheduled actions apply
//! FIFO within their tick. Two runs with equal seed and config produce
//! identical traces.

mod effector;
mod error;
mod fleet;
mod link;
mod mirror;
mod network;
mod predict;
mod probe;
mod rng;
pub mod topology;

pub use effector::{Action, Effector, ScheduledAction};
pub use error::{NetworkError, TopologyError};
pub use fleet::Fleet;
pub use link::{Link, LinkKey};
pub use mirror::Mirror;
pub use network::Network;
pub use predict::{Effect, predict};
pub use probe::{LinkProbe, LinkSample, MirrorProbe, MirrorSample, Probe};
pub use rng::SimRng;
pub use topology::{
    BalancedTreeTopology, FullyConnectedTopology, LineTopology, NConnectedTopology, RingTopology,
    SnowflakeParams, SnowflakePlan, SnowflakeTopology, StarTopology, StrategyKind,
    TopologyStrategy, UnknownStrategy, build_strategy,
};
