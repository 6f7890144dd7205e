//! Configuration for the replimesh simulator.
//!
//! The simulator is driven by a flat key/value table (TOML on disk).
//! [`SimProperties`] holds the raw table and offers typed accessors that
//! fail with the offending key's name; [`TimingConfig`] bundles the
//! duration ranges the state machines sample from.
//!
//! Precedence is simple: a config file provides the base table and the
//! CLI may overwrite individual keys before the simulation starts.
//! Unknown keys are tolerated (warning only).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::warn;

mod error;
pub mod keys;

pub use error::{ConfigError, Result};

// ============================================================================
// Properties Table
// ============================================================================

/// Flat key/value configuration table.
#[derive(Debug, Clone, Default)]
pub struct SimProperties {
    values: BTreeMap<String, toml::Value>,
}

impl SimProperties {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a table from a TOML file.
    ///
    /// Keys outside [`keys::RECOGNIZED`] are kept but logged at warn
    /// level.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table: toml::Table = raw.parse().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_table(table))
    }

    /// Builds a table from already-parsed TOML.
    pub fn from_table(table: toml::Table) -> Self {
        let mut values = BTreeMap::new();
        for (key, value) in table {
            if !keys::RECOGNIZED.contains(&key.as_str()) {
                warn!(key = %key, "ignoring unrecognized config key");
            }
            values.insert(key, value);
        }
        Self { values }
    }

    /// Sets or overwrites a single key (CLI overrides, tests).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Required unsigned integer.
    pub fn get_u64(&self, key: &str) -> Result<u64> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        match value {
            toml::Value::Integer(i) if *i >= 0 => Ok(*i as u64),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: other.to_string(),
                reason: "expected a non-negative integer".to_string(),
            }),
        }
    }

    /// Unsigned integer with a default for absent keys.
    pub fn get_u64_or(&self, key: &str, default: u64) -> Result<u64> {
        if self.contains(key) {
            self.get_u64(key)
        } else {
            Ok(default)
        }
    }

    /// Required real number (integer values are accepted and widened).
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        match value {
            toml::Value::Float(f) => Ok(*f),
            toml::Value::Integer(i) => Ok(*i as f64),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: other.to_string(),
                reason: "expected a number".to_string(),
            }),
        }
    }

    /// Real number with a default for absent keys.
    pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64> {
        if self.contains(key) {
            self.get_f64(key)
        } else {
            Ok(default)
        }
    }

    /// Probability in `[0, 1]`.
    pub fn get_probability_or(&self, key: &str, default: f64) -> Result<f64> {
        let p = self.get_f64_or(key, default)?;
        if (0.0..=1.0).contains(&p) {
            Ok(p)
        } else {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: p.to_string(),
                reason: "expected a probability in [0, 1]".to_string(),
            })
        }
    }
}

// ============================================================================
// Duration Ranges & Timing
// ============================================================================

/// Inclusive integer range a duration is sampled from, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
    pub min: u64,
    pub max: u64,
}

impl DurationRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    fn from_props(props: &SimProperties, min_key: &str, max_key: &str) -> Result<Self> {
        let min = props.get_u64(min_key)?;
        let max = props.get_u64(max_key)?;
        if min > max {
            return Err(ConfigError::EmptyRange {
                min_key: min_key.to_string(),
                max_key: max_key.to_string(),
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }
}

/// The duration ranges and bandwidth knobs the state machines run on.
#[derive(Debug, Clone, Copy)]
pub struct TimingConfig {
    /// Ticks from `Starting` to `Up`.
    pub startup: DurationRange,
    /// Ticks from `Up` to `Ready`.
    pub ready: DurationRange,
    /// Ticks from `Stopping` to `Stopped`.
    pub stop: DurationRange,
    /// Ticks from both-endpoints-up to `Active`.
    pub link_activation: DurationRange,
    /// Units delivered per tick per active link.
    pub link_bandwidth: u64,
    /// Per-tick per-mirror crash probability (never applied to the root).
    pub fault_probability: f64,
}

impl TimingConfig {
    /// Reads the timing bundle out of a properties table.
    pub fn from_props(props: &SimProperties) -> Result<Self> {
        Ok(Self {
            startup: DurationRange::from_props(props, keys::STARTUP_TIME_MIN, keys::STARTUP_TIME_MAX)?,
            ready: DurationRange::from_props(props, keys::READY_TIME_MIN, keys::READY_TIME_MAX)?,
            stop: DurationRange::from_props(props, keys::STOP_TIME_MIN, keys::STOP_TIME_MAX)?,
            link_activation: DurationRange::from_props(
                props,
                keys::LINK_ACTIVATION_TIME_MIN,
                keys::LINK_ACTIVATION_TIME_MAX,
            )?,
            link_bandwidth: props.get_u64(keys::LINK_BANDWIDTH)?,
            fault_probability: props.get_probability_or(keys::FAULT_PROBABILITY, 0.0)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use test_case::test_case;

    use super::*;

    fn props(toml: &str) -> SimProperties {
        SimProperties::from_table(toml.parse().expect("test table parses"))
    }

    const BASE: &str = r"
        startup_time_min = 1
        startup_time_max = 3
        ready_time_min = 0
        ready_time_max = 2
        stop_time_min = 1
        stop_time_max = 1
        link_activation_time_min = 2
        link_activation_time_max = 4
        link_bandwidth = 8
    ";

    #[test]
    fn timing_config_reads_all_ranges() {
        let timing = TimingConfig::from_props(&props(BASE)).expect("timing parses");
        assert_eq!(timing.startup, DurationRange::new(1, 3));
        assert_eq!(timing.link_activation, DurationRange::new(2, 4));
        assert_eq!(timing.link_bandwidth, 8);
        assert_eq!(timing.fault_probability, 0.0);
    }

    #[test]
    fn missing_key_names_the_key() {
        let table = props("startup_time_min = 1");
        let err = table.get_u64(keys::SIM_TIME).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(k) if k == "sim_time"));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut table = props(BASE);
        table.set(keys::STARTUP_TIME_MIN, 9);
        let err = TimingConfig::from_props(&table).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRange { min: 9, max: 3, .. }));
    }

    #[test_case(-0.5; "below zero")]
    #[test_case(1.5; "above one")]
    fn out_of_range_probability_is_rejected(p: f64) {
        let mut table = props(BASE);
        table.set(keys::FAULT_PROBABILITY, p);
        assert!(TimingConfig::from_props(&table).is_err());
    }

    #[test]
    fn integer_is_accepted_where_a_real_is_expected() {
        let mut table = props(BASE);
        table.set(keys::EXTERN_STAR_RATIO, 0);
        assert_eq!(table.get_f64(keys::EXTERN_STAR_RATIO).unwrap(), 0.0);
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let table = props("experiment_label = \"run-47\"\nsim_time = 10");
        assert_eq!(table.get_u64(keys::SIM_TIME).unwrap(), 10);
    }

    #[test]
    fn load_from_file_round_trips() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{BASE}\nsim_time = 50\nnum_mirrors = 10").expect("write config");

        let table = SimProperties::from_file(file.path()).expect("load config");
        assert_eq!(table.get_u64(keys::SIM_TIME).unwrap(), 50);
        assert_eq!(table.get_u64(keys::NUM_MIRRORS).unwrap(), 10);
        assert!(TimingConfig::from_props(&table).is_ok());
    }

    #[test]
    fn negative_integer_is_rejected_for_u64() {
        let table = props("file_size = -3");
        assert!(matches!(
            table.get_u64(keys::FILE_SIZE),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
