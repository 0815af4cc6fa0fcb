//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`Registry`](crate::Registry).
///
/// `debug` makes a directory-backed registry re-parse file-sourced sets from
/// disk before every render, so edits show up without re-registering or
/// restarting. It has no effect on archive-backed registries, whose content
/// cannot change.
///
/// The struct deserializes from any serde format with missing fields taking
/// their defaults:
///
/// ```rust
/// use templatebox::Config;
///
/// let config: Config = serde_json::from_str(r#"{ "debug": true }"#).unwrap();
/// assert!(config.debug);
///
/// let config: Config = serde_json::from_str("{}").unwrap();
/// assert_eq!(config, Config::default());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Re-parse file-sourced sets before every render.
    pub debug: bool,
}

impl Config {
    /// Creates the default configuration (debug disabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_not_debug() {
        assert!(!Config::default().debug);
        assert!(!Config::new().debug);
    }

    #[test]
    fn test_with_debug() {
        assert!(Config::new().with_debug(true).debug);
        assert!(!Config::new().with_debug(true).with_debug(false).debug);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }
}
