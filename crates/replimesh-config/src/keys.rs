//! Recognised configuration keys.
//!
//! The configuration surface is a flat key/value table. Keys outside
//! [`RECOGNIZED`] are tolerated with a warning so that experiment configs
//! can carry annotations without breaking older builds.

pub const STARTUP_TIME_MIN: &str = "startup_time_min";
pub const STARTUP_TIME_MAX: &str = "startup_time_max";
pub const READY_TIME_MIN: &str = "ready_time_min";
pub const READY_TIME_MAX: &str = "ready_time_max";
pub const STOP_TIME_MIN: &str = "stop_time_min";
pub const STOP_TIME_MAX: &str = "stop_time_max";
pub const LINK_ACTIVATION_TIME_MIN: &str = "link_activation_time_min";
pub const LINK_ACTIVATION_TIME_MAX: &str = "link_activation_time_max";
pub const LINK_BANDWIDTH: &str = "link_bandwidth";
pub const MAX_BANDWIDTH: &str = "max_bandwidth";
pub const FAULT_PROBABILITY: &str = "fault_probability";
pub const FILE_SIZE: &str = "file_size";
pub const NUM_MIRRORS: &str = "num_mirrors";
pub const NUM_LINKS_PER_MIRROR: &str = "num_links_per_mirror";
pub const SEED: &str = "seed";
pub const SIM_TIME: &str = "sim_time";

// Snowflake topology knobs
pub const MINIMAL_RING_MIRROR_COUNT: &str = "minimal_ring_mirror_count";
pub const MAX_RING_LAYERS: &str = "max_ring_layers";
pub const RING_BRIDGE_STEP: &str = "ring_bridge_step";
pub const RING_BRIDGE_OFFSET: &str = "ring_bridge_offset";
pub const BRIDGE_HEIGHT: &str = "bridge_height";
pub const EXTERN_STAR_RATIO: &str = "extern_star_ratio";
pub const EXTERN_STAR_MAX_TREE_DEPTH: &str = "extern_star_max_tree_depth";
pub const BRIDGE_TO_EXTERN_STAR_DISTANCE: &str = "bridge_to_extern_star_distance";

/// All keys the simulator understands.
pub const RECOGNIZED: &[&str] = &[
    STARTUP_TIME_MIN,
    STARTUP_TIME_MAX,
    READY_TIME_MIN,
    READY_TIME_MAX,
    STOP_TIME_MIN,
    STOP_TIME_MAX,
    LINK_ACTIVATION_TIME_MIN,
    LINK_ACTIVATION_TIME_MAX,
    LINK_BANDWIDTH,
    MAX_BANDWIDTH,
    FAULT_PROBABILITY,
    FILE_SIZE,
    NUM_MIRRORS,
    NUM_LINKS_PER_MIRROR,
    SEED,
    SIM_TIME,
    MINIMAL_RING_MIRROR_COUNT,
    MAX_RING_LAYERS,
    RING_BRIDGE_STEP,
    RING_BRIDGE_OFFSET,
    BRIDGE_HEIGHT,
    EXTERN_STAR_RATIO,
    EXTERN_STAR_MAX_TREE_DEPTH,
    BRIDGE_TO_EXTERN_STAR_DISTANCE,
];
