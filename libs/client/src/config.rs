//! Client configuration
//!
//! Deserialized from TOML. Every field has a default so an empty file (or
//! none at all) yields a working local configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Settings consumed by applications when wiring up a face
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Transport URI of the local forwarder
    pub transport: String,
    /// Default Interest lifetime in milliseconds
    pub default_lifetime: u64,
    /// Per-segment retry limit for the segment fetcher
    pub segment_retry_times: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: "unix:///run/nfd/nfd.sock".into(),
            default_lifetime: 4000,
            segment_retry_times: 3,
        }
    }
}

impl ClientConfig {
    pub fn from_toml(text: &str) -> ClientResult<Self> {
        toml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn load(path: &std::path::Path) -> ClientResult<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ClientError::Config(e.to_string()))?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.transport, "unix:///run/nfd/nfd.sock");
    }

    #[test]
    fn test_partial_override() {
        let config = ClientConfig::from_toml("transport = \"tcp://127.0.0.1:6363\"").unwrap();
        assert_eq!(config.transport, "tcp://127.0.0.1:6363");
        assert_eq!(config.default_lifetime, 4000);
    }

    #[test]
    fn test_rejects_bad_toml() {
        assert!(ClientConfig::from_toml("transport = [").is_err());
    }
}
