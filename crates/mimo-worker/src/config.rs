//! Worker-facing configuration: an untyped JSON object, the same shape a
//! per-worker setup block takes whether it arrived as an inline value or
//! was read from a file by an embedder. `mimo-worker` itself never reads
//! files; it only accepts already-parsed values, keeping the "accepts a
//! path, an inline object, or a list of either" flexibility one layer up
//! where the setup file format is actually decided.

use serde_json::{Map, Value};

use crate::error::WorkerError;

/// A worker's configuration block: a flat or nested JSON object accessed by
/// key, with typed getters for the common scalar cases. Unknown keys are
/// simply ignored, matching a `dict`-like config rather than a fixed
/// struct, templates only ever look up the handful of keys they need.
#[derive(Debug, Clone, Default)]
pub struct Config(Map<String, Value>);

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a config from an already-parsed JSON value, which must be an
    /// object at the top level.
    pub fn from_value(template: &'static str, value: Value) -> Result<Self, WorkerError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            _ => Err(WorkerError::Configuration {
                template,
                key: "<root>".to_owned(),
            }),
        }
    }

    /// Merges several config blocks left-to-right, later blocks overriding
    /// earlier ones on key collision. Mirrors accepting a list of setup
    /// fragments instead of a single one.
    #[must_use]
    pub fn merge(mut configs: Vec<Config>) -> Self {
        let mut merged = Map::new();
        for config in &mut configs {
            merged.append(&mut config.0);
        }
        Self(merged)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// `debug` controls whether a transient user-code error aborts the
    /// worker process (`true`) or is logged and skipped (`false`, default).
    #[must_use]
    pub fn debug(&self) -> bool {
        self.get_bool("debug").unwrap_or(false)
    }
}
