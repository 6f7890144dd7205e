//! # replimesh-types: Core types for the replimesh simulator
//!
//! This crate contains the shared vocabulary of the simulator:
//! - Entity ids ([`MirrorId`], [`LinkId`], [`NodeId`], [`ActionId`])
//! - Monotone id allocation ([`IdAllocator`])
//! - State machines' state enums ([`MirrorState`], [`LinkState`])
//! - Structure tagging ([`StructureType`])
//! - Payload accounting ([`DataPackage`])
//!
//! Everything here is cheap to copy and free of behaviour beyond the
//! accounting rules baked into [`DataPackage`]; the state machines
//! themselves live in `replimesh-core`.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

// ============================================================================
// Entity IDs - All Copy (cheap 8-byte values)
// ============================================================================

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_newtype! {
    /// Unique identifier for a mirror (a stateful node of the overlay).
    MirrorId
}

id_newtype! {
    /// Unique identifier for a link (an undirected edge between mirrors).
    LinkId
}

id_newtype! {
    /// Unique identifier for a structure node owned by a topology strategy.
    NodeId
}

id_newtype! {
    /// Handle for a scheduled effector action, used for cancellation.
    ActionId
}

// ============================================================================
// Id Allocation
// ============================================================================

/// Monotone unique id allocation for mirrors, links, structure nodes and
/// scheduled actions.
///
/// Each id space is independent; ids are never reused within a run, so a
/// removed mirror's id stays retired.
///
/// # Examples
///
/// ```
/// # use replimesh_types::IdAllocator;
/// let mut ids = IdAllocator::new();
/// let a = ids.next_mirror_id();
/// let b = ids.next_mirror_id();
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next_mirror: u64,
    next_link: u64,
    next_node: u64,
    next_action: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_mirror_id(&mut self) -> MirrorId {
        let id = MirrorId::new(self.next_mirror);
        self.next_mirror += 1;
        id
    }

    pub fn next_link_id(&mut self) -> LinkId {
        let id = LinkId::new(self.next_link);
        self.next_link += 1;
        id
    }

    pub fn next_node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node);
        self.next_node += 1;
        id
    }

    pub fn next_action_id(&mut self) -> ActionId {
        let id = ActionId::new(self.next_action);
        self.next_action += 1;
        id
    }
}

// ============================================================================
// Mirror State
// ============================================================================

/// Lifecycle state of a mirror.
///
/// The derived ordering follows the lifecycle, which makes the
/// no-backwards-transition invariant a simple `<=` check: a mirror may
/// only ever move to a state that compares greater than its current one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum MirrorState {
    /// Freshly allocated, not yet booting.
    #[default]
    Down,
    /// Booting; leaves after the sampled startup duration.
    Starting,
    /// Booted but not yet serving.
    Up,
    /// Serving and able to receive payload data.
    Ready,
    /// Holds the complete data package and acts as a source.
    HasData,
    /// Shutting down; leaves after the sampled stop duration.
    Stopping,
    /// Terminal. The network removes stopped mirrors at the next tick.
    Stopped,
}

impl MirrorState {
    /// True once the mirror has completed startup (`Up` or later, but
    /// not shutting down).
    pub fn is_up(self) -> bool {
        matches!(self, MirrorState::Up | MirrorState::Ready | MirrorState::HasData)
    }

    /// True while the mirror can accept payload data.
    pub fn is_receiving(self) -> bool {
        matches!(self, MirrorState::Up | MirrorState::Ready)
    }

    /// True for the terminal state.
    pub fn is_stopped(self) -> bool {
        self == MirrorState::Stopped
    }

    /// True once shutdown has begun (terminal or on the way there).
    pub fn is_stopping_or_stopped(self) -> bool {
        matches!(self, MirrorState::Stopping | MirrorState::Stopped)
    }
}

impl Display for MirrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MirrorState::Down => "down",
            MirrorState::Starting => "starting",
            MirrorState::Up => "up",
            MirrorState::Ready => "ready",
            MirrorState::HasData => "has-data",
            MirrorState::Stopping => "stopping",
            MirrorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Link State
// ============================================================================

/// Activation state of a link.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum LinkState {
    /// Created but not yet carrying data.
    #[default]
    Inactive,
    /// Both endpoints up and the activation delay has elapsed.
    Active,
    /// Terminal. A closed link never reactivates.
    Closed,
}

impl LinkState {
    pub fn is_active(self) -> bool {
        self == LinkState::Active
    }

    pub fn is_closed(self) -> bool {
        self == LinkState::Closed
    }
}

impl Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Inactive => "inactive",
            LinkState::Active => "active",
            LinkState::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Structure Tagging
// ============================================================================

/// Structural role tag carried by topology structure nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StructureType {
    #[default]
    Generic,
    Tree,
    Ring,
    Line,
    Star,
    Snowflake,
}

impl Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StructureType::Generic => "generic",
            StructureType::Tree => "tree",
            StructureType::Ring => "ring",
            StructureType::Line => "line",
            StructureType::Star => "star",
            StructureType::Snowflake => "snowflake",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Data Package
// ============================================================================

/// Payload size accounting for one mirror's copy of the replicated data.
///
/// `received` never exceeds `size`; deliveries are capped at the
/// remaining gap and the delivered amount is reported back so the caller
/// can record per-tick bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPackage {
    size: u64,
    received: u64,
    invalid: bool,
}

impl DataPackage {
    /// Creates an empty package expecting `size` units in total.
    pub fn new(size: u64) -> Self {
        Self {
            size,
            received: 0,
            invalid: false,
        }
    }

    /// Creates an already-complete package (the seed copy on the root).
    pub fn complete(size: u64) -> Self {
        Self {
            size,
            received: size,
            invalid: false,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn remaining(&self) -> u64 {
        self.size - self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.size
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Marks the package as invalid (e.g. superseded after a topology
    /// restart re-seeds distribution).
    pub fn invalidate(&mut self) {
        self.invalid = true;
    }

    /// Accepts up to `amount` units, capped at the remaining gap.
    ///
    /// Returns the amount actually delivered.
    pub fn deliver(&mut self, amount: u64) -> u64 {
        let delivered = amount.min(self.remaining());
        self.received += delivered;
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_allocation_is_monotone_per_space() {
        let mut ids = IdAllocator::new();
        let m0 = ids.next_mirror_id();
        let l0 = ids.next_link_id();
        let m1 = ids.next_mirror_id();

        assert_eq!(m0.as_u64(), 0);
        assert_eq!(m1.as_u64(), 1);
        // Link ids are an independent space.
        assert_eq!(l0.as_u64(), 0);
    }

    #[test]
    fn mirror_state_ordering_follows_lifecycle() {
        assert!(MirrorState::Down < MirrorState::Starting);
        assert!(MirrorState::Starting < MirrorState::Up);
        assert!(MirrorState::Up < MirrorState::Ready);
        assert!(MirrorState::Ready < MirrorState::HasData);
        assert!(MirrorState::HasData < MirrorState::Stopping);
        assert!(MirrorState::Stopping < MirrorState::Stopped);
    }

    #[test]
    fn receiving_states() {
        assert!(MirrorState::Up.is_receiving());
        assert!(MirrorState::Ready.is_receiving());
        assert!(!MirrorState::HasData.is_receiving());
        assert!(!MirrorState::Stopping.is_receiving());
    }

    #[test]
    fn package_delivery_caps_at_remaining() {
        let mut pkg = DataPackage::new(10);
        assert_eq!(pkg.deliver(4), 4);
        assert_eq!(pkg.deliver(4), 4);
        // Only 2 units left; the rest of the tick's bandwidth is unused.
        assert_eq!(pkg.deliver(4), 2);
        assert!(pkg.is_complete());
        assert_eq!(pkg.deliver(4), 0);
        assert_eq!(pkg.received(), 10);
    }

    #[test]
    fn complete_package_starts_full() {
        let pkg = DataPackage::complete(128);
        assert!(pkg.is_complete());
        assert_eq!(pkg.remaining(), 0);
    }
}
