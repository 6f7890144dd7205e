//! Error types for fleet and topology operations.

use replimesh_types::{MirrorId, StructureType};
use thiserror::Error;

/// Errors raised by topology strategy validators and builders.
///
/// Validators run before any mutation; a returned error leaves the fleet
/// untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopologyError {
    /// The requested mirror partition cannot form the topology.
    #[error(
        "invalid mirror distribution (total {total}, rings {ring_mirrors}, stars {star_mirrors}): {reason}"
    )]
    InvalidMirrorDistribution {
        total: usize,
        ring_mirrors: usize,
        star_mirrors: usize,
        reason: String,
    },

    /// A ring would fall below the configured minimum membership.
    #[error("ring {ring} needs {required} mirrors but only {available} are available")]
    InsufficientMirrorsForRing {
        available: usize,
        required: usize,
        ring: usize,
    },

    /// A configured ring knob is outside its documented constraint.
    #[error("ring parameter `{parameter}` = {actual} violates constraint: {constraint}")]
    InvalidRingParameter {
        parameter: &'static str,
        actual: i64,
        constraint: &'static str,
    },

    /// A configured star knob is outside its documented constraint.
    #[error("star parameter `{parameter}` = {actual} violates constraint: {constraint}")]
    InvalidStarParameter {
        parameter: &'static str,
        actual: f64,
        constraint: &'static str,
    },

    /// A second link between the same unordered endpoint pair.
    #[error("duplicate link between mirrors {a} and {b}")]
    DuplicateLink { a: MirrorId, b: MirrorId },

    /// A link from a mirror to itself.
    #[error("self-link on mirror {0}")]
    SelfLink(MirrorId),

    /// A referenced mirror does not exist (or has already left the fleet).
    #[error("unknown mirror {0}")]
    UnknownMirror(MirrorId),

    /// A structural invariant failed after a mutation. Indicates a bug.
    #[error("structural invariant violated for {structure}: {detail}")]
    InvariantViolation {
        structure: StructureType,
        detail: String,
    },
}

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors surfaced by network-level operations, which may fail either in
/// a strategy validator or while reading configuration.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Config(#[from] replimesh_config::ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}
