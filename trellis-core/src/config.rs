//! Runtime configuration.
//!
//! Configuration is plain data so it can be loaded from JSON. Anything that
//! is behavior rather than data (error and warning handlers) is installed on
//! the [`Runtime`](crate::reactive::Runtime) directly.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default number of times one watcher may re-queue itself within a single
/// flush before the flush is aborted.
pub const MAX_UPDATE_COUNT: u32 = 100;

/// Global runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Suppress logging of warnings and unhandled errors. Control flow is
    /// identical either way.
    pub silent: bool,

    /// Defer watcher flushes to the next tick. When false every enqueue
    /// flushes immediately and dependencies notify in watcher-id order,
    /// which makes tests deterministic.
    #[serde(rename = "async")]
    pub async_flush: bool,

    /// Re-entry threshold for the runaway update guard.
    pub max_update_count: u32,

    /// Custom element names that should not trigger unknown-element warnings.
    pub ignored_elements: Vec<String>,

    /// Log render and patch timings at debug level.
    pub performance: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            silent: false,
            async_flush: true,
            max_update_count: MAX_UPDATE_COUNT,
            ignored_elements: Vec::new(),
            performance: false,
        }
    }
}

impl Config {
    /// A configuration that flushes synchronously on every update.
    pub fn synchronous() -> Self {
        Self {
            async_flush: false,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether `tag` is listed in [`Config::ignored_elements`].
    pub fn is_ignored_element(&self, tag: &str) -> bool {
        self.ignored_elements.iter().any(|ignored| ignored == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_async_with_loop_guard() {
        let config = Config::default();
        assert!(config.async_flush);
        assert!(!config.silent);
        assert_eq!(config.max_update_count, MAX_UPDATE_COUNT);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = Config::from_json_str(r#"{ "async": false, "ignored_elements": ["x-foo"] }"#)
            .unwrap();
        assert!(!config.async_flush);
        assert_eq!(config.max_update_count, MAX_UPDATE_COUNT);
        assert!(config.is_ignored_element("x-foo"));
        assert!(!config.is_ignored_element("x-bar"));
    }

    #[test]
    fn json_round_trip_keeps_async_name() {
        let json = Config::synchronous().to_json().unwrap();
        assert!(json.contains("\"async\":false"));
        assert_eq!(Config::from_json_str(&json).unwrap(), Config::synchronous());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(Config::from_json_str("{ nope").is_err());
    }
}
