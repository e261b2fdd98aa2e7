//! Registry and device handle configuration
//!
//! Loaded from TOML; every field is optional and falls back to its default.
//!
//! ```toml
//! poll_interval_ms = 500
//! open_timeout_ms = 2000
//! send_timeout_ms = 1000
//! event_capacity = 16
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Blink1Error;

/// Tunables for [`crate::Blink1Registry`] and [`crate::Blink1`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blink1Config {
    /// Time between hot-plug enumerations
    pub poll_interval_ms: u64,
    /// Upper bound for opening a device connection
    pub open_timeout_ms: u64,
    /// Upper bound for one feature report transfer
    pub send_timeout_ms: u64,
    /// Buffered lifecycle events per subscriber before it lags
    pub event_capacity: usize,
}

impl Default for Blink1Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            open_timeout_ms: 2000,
            send_timeout_ms: 1000,
            event_capacity: 16,
        }
    }
}

impl Blink1Config {
    /// Parse from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, Blink1Error> {
        let config: Blink1Config =
            toml::from_str(content).map_err(|e| Blink1Error::Config(format!("parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Blink1Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Blink1Error::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Reject values that would stall the watcher or the event channel
    pub fn validate(&self) -> Result<(), Blink1Error> {
        if self.poll_interval_ms == 0 {
            return Err(Blink1Error::Config("poll_interval_ms must be > 0".into()));
        }
        if self.open_timeout_ms == 0 || self.send_timeout_ms == 0 {
            return Err(Blink1Error::Config("timeouts must be > 0".into()));
        }
        if self.event_capacity == 0 {
            return Err(Blink1Error::Config("event_capacity must be > 0".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(Blink1Config::from_toml("").unwrap(), Blink1Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Blink1Config::from_toml("poll_interval_ms = 250\nevent_capacity = 4").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.event_capacity, 4);
        assert_eq!(config.send_timeout_ms, 1000);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            Blink1Config::from_toml("poll_interval_ms = 0"),
            Err(Blink1Error::Config(_))
        ));
        assert!(matches!(
            Blink1Config::from_toml("event_capacity = 0"),
            Err(Blink1Error::Config(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Blink1Config::from_toml("poll_interval_ms = \"fast\""),
            Err(Blink1Error::Config(_))
        ));
    }
}
