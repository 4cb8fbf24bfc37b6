//! Bridge configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration:
//!
//! ```
//! use ledger_bridge_core::config::{BridgeConfig, DiscoveryMode};
//!
//! let config = BridgeConfig::from_json(r#"{ "pollAttempts": 10 }"#).unwrap();
//! assert_eq!(config.poll_attempts, 10);
//! assert_eq!(config.initial_mode, DiscoveryMode::Direct);
//! ```

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default companion endpoint.
pub const DEFAULT_BRIDGE_URL: &str = "ws://localhost:8435";

/// Default URI asking the environment to start the companion.
pub const DEFAULT_COMPANION_LAUNCH_URI: &str = "ledgerlive://bridge?appName=Everscale";

/// Default delay between two discovery probes.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default number of discovery probes.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 120;

/// How the session manager reaches the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscoveryMode {
    /// Open a locally attached device.
    #[default]
    Direct,

    /// Go through the companion endpoint, launching the companion if needed.
    CompanionBridge,
}

impl DiscoveryMode {
    /// Maps the companion preference flag of the control surface.
    #[must_use]
    pub const fn from_companion_flag(use_companion: bool) -> Self {
        if use_companion {
            Self::CompanionBridge
        } else {
            Self::Direct
        }
    }
}

/// Session and discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Companion endpoint probed and opened in bridge mode.
    pub bridge_url: String,

    /// URI handed to the environment to start the companion.
    pub companion_launch_uri: String,

    /// Delay between two discovery probes, in milliseconds.
    pub poll_interval_ms: u64,

    /// Maximum number of discovery probes.
    pub poll_attempts: u32,

    /// Discovery mode in effect at start.
    pub initial_mode: DiscoveryMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            companion_launch_uri: DEFAULT_COMPANION_LAUNCH_URI.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            initial_mode: DiscoveryMode::Direct,
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `poll_attempts` is zero or the
    /// bridge URL is empty.
    pub fn validate(&self) -> Result<()> {
        if self.poll_attempts == 0 {
            return Err(Error::InvalidRequest(
                "pollAttempts must be at least 1".to_string(),
            ));
        }
        if self.bridge_url.trim().is_empty() {
            return Err(Error::InvalidRequest("bridgeUrl is empty".to_string()));
        }
        Ok(())
    }

    /// Returns the delay between two discovery probes.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.bridge_url, "ws://localhost:8435");
        assert_eq!(config.companion_launch_uri, "ledgerlive://bridge?appName=Everscale");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.poll_attempts, 120);
        assert_eq!(config.initial_mode, DiscoveryMode::Direct);
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(BridgeConfig::from_json("{}").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn camel_case_fields() {
        let config = BridgeConfig::from_json(
            r#"{
                "bridgeUrl": "ws://127.0.0.1:9000",
                "pollIntervalMs": 250,
                "initialMode": "companionBridge"
            }"#,
        )
        .unwrap();

        assert_eq!(config.bridge_url, "ws://127.0.0.1:9000");
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.initial_mode, DiscoveryMode::CompanionBridge);
        assert_eq!(config.poll_attempts, DEFAULT_POLL_ATTEMPTS);
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = BridgeConfig::from_json(r#"{ "pollAttempts": 0 }"#).unwrap_err();
        assert_eq!(err.reason(), "INVALID_REQUEST");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = BridgeConfig::from_json("{ pollAttempts").unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn companion_flag() {
        assert_eq!(
            DiscoveryMode::from_companion_flag(true),
            DiscoveryMode::CompanionBridge
        );
        assert_eq!(DiscoveryMode::from_companion_flag(false), DiscoveryMode::Direct);
    }
}
